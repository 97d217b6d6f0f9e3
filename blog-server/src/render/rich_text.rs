use std::collections::HashMap;
use std::fmt::Write;

use crate::cms::rich_text::{BlockStyle, ListKind, RichTextBlock, Span, TextBlock};
use crate::render::{escape_html, image, safe_href, slugify};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TocEntry {
    pub id: String,
    pub text: String,
    pub level: u8,
}

/// Assigns each heading a unique anchor id, numbering repeats.
#[derive(Default)]
struct HeadingIds {
    seen: HashMap<String, usize>,
}

impl HeadingIds {
    fn next(&mut self, text: &str) -> String {
        let base = match slugify(text) {
            slug if slug.is_empty() => "section".to_string(),
            slug => slug,
        };
        let count = self.seen.entry(base.clone()).or_insert(0);
        *count += 1;
        match *count {
            1 => base,
            n => format!("{}-{}", base, n),
        }
    }
}

/// Headings that appear in the sidebar table of contents.
pub fn table_of_contents(blocks: &[RichTextBlock]) -> Vec<TocEntry> {
    let mut ids = HeadingIds::default();
    blocks
        .iter()
        .filter_map(|block| match block {
            RichTextBlock::Block(text) if text.list_item.is_none() => {
                text.style.heading_level().map(|level| (text, level))
            }
            _ => None,
        })
        .filter_map(|(text, level)| {
            let plain = text.plain_text();
            let id = ids.next(&plain);
            matches!(level, 2 | 3).then(|| TocEntry {
                id,
                text: plain,
                level,
            })
        })
        .collect()
}

pub fn render_table_of_contents(out: &mut String, entries: &[TocEntry]) {
    if entries.is_empty() {
        return;
    }
    out.push_str("<nav class=\"table-of-content\"><p>On this page</p><ul>");
    for entry in entries {
        let _ = write!(
            out,
            "<li class=\"toc-level-{}\"><a href=\"#{}\">{}</a></li>",
            entry.level,
            escape_html(&entry.id),
            escape_html(&entry.text)
        );
    }
    out.push_str("</ul></nav>");
}

pub fn render_rich_text(out: &mut String, blocks: &[RichTextBlock]) {
    let mut ids = HeadingIds::default();
    let mut open_list: Option<ListKind> = None;

    out.push_str("<div class=\"rich-text\">");
    for block in blocks {
        let list_kind = match block {
            RichTextBlock::Block(text) => text.list_item,
            _ => None,
        };
        if open_list != list_kind {
            close_list(out, open_list);
            open_list = list_kind;
            match list_kind {
                Some(ListKind::Bullet) => out.push_str("<ul>"),
                Some(ListKind::Number) => out.push_str("<ol>"),
                None => {}
            }
        }

        match block {
            RichTextBlock::Block(text) if text.list_item.is_some() => {
                out.push_str("<li>");
                render_spans(out, text);
                out.push_str("</li>");
            }
            RichTextBlock::Block(text) => render_text_block(out, text, &mut ids),
            RichTextBlock::Image(img) => {
                out.push_str("<figure>");
                image(out, img, "", 1600, None, "rich-text-image");
                out.push_str("</figure>");
            }
            RichTextBlock::Unsupported => {
                tracing::debug!("skipping unsupported rich text block");
            }
        }
    }
    close_list(out, open_list);
    out.push_str("</div>");
}

fn close_list(out: &mut String, list: Option<ListKind>) {
    match list {
        Some(ListKind::Bullet) => out.push_str("</ul>"),
        Some(ListKind::Number) => out.push_str("</ol>"),
        None => {}
    }
}

fn render_text_block(out: &mut String, block: &TextBlock, ids: &mut HeadingIds) {
    match block.style {
        style if style.heading_level().is_some() => {
            let level = style.heading_level().unwrap_or(2);
            let id = ids.next(&block.plain_text());
            let _ = write!(out, "<h{} id=\"{}\">", level, escape_html(&id));
            render_spans(out, block);
            let _ = write!(out, "</h{}>", level);
        }
        BlockStyle::Blockquote => {
            out.push_str("<blockquote>");
            render_spans(out, block);
            out.push_str("</blockquote>");
        }
        _ => {
            out.push_str("<p>");
            render_spans(out, block);
            out.push_str("</p>");
        }
    }
}

fn render_spans(out: &mut String, block: &TextBlock) {
    for span in &block.children {
        render_span(out, block, span);
    }
}

fn render_span(out: &mut String, block: &TextBlock, span: &Span) {
    let mut closing = Vec::new();
    for mark in &span.marks {
        let tag = match mark.as_str() {
            "strong" => Some(("<strong>".to_string(), "</strong>")),
            "em" => Some(("<em>".to_string(), "</em>")),
            "code" => Some(("<code>".to_string(), "</code>")),
            "underline" => Some(("<u>".to_string(), "</u>")),
            "strike-through" => Some(("<s>".to_string(), "</s>")),
            key => block
                .mark_def(key)
                .and_then(|def| def.href.as_deref())
                .and_then(safe_href)
                .map(|href| (format!("<a href=\"{}\">", href), "</a>")),
        };
        if let Some((open, close)) = tag {
            out.push_str(&open);
            closing.push(close);
        }
    }
    out.push_str(&escape_html(&span.text));
    for close in closing.iter().rev() {
        out.push_str(close);
    }
}
