use std::fmt::Write;

use crate::cms::documents::{Button, PageBuilderSection};
use crate::render::rich_text::render_rich_text;
use crate::render::{escape_html, image, safe_href};

/// Renders the CMS-driven sections in order. `id` and `kind` identify the
/// owning document so editors can map sections back to it.
pub fn render_page_builder(out: &mut String, sections: &[PageBuilderSection], id: &str, kind: &str) {
    if sections.is_empty() {
        return;
    }
    let _ = write!(
        out,
        "<section class=\"page-builder\" data-document-id=\"{}\" data-document-type=\"{}\">",
        escape_html(id),
        escape_html(kind)
    );
    for section in sections {
        render_section(out, section);
    }
    out.push_str("</section>");
}

fn render_section(out: &mut String, section: &PageBuilderSection) {
    match section {
        PageBuilderSection::Hero {
            badge,
            title,
            rich_text,
            image: hero_image,
            buttons,
            ..
        } => {
            out.push_str("<div class=\"hero\">");
            optional_tag(out, "span", "badge", badge.as_deref());
            optional_tag(out, "h1", "hero-title", title.as_deref());
            render_rich_text(out, rich_text);
            render_buttons(out, buttons);
            if let Some(hero_image) = hero_image {
                image(out, hero_image, title.as_deref().unwrap_or(""), 800, None, "hero-image");
            }
            out.push_str("</div>");
        }
        PageBuilderSection::Cta {
            eyebrow,
            title,
            rich_text,
            buttons,
            ..
        } => {
            out.push_str("<div class=\"cta\">");
            optional_tag(out, "p", "eyebrow", eyebrow.as_deref());
            optional_tag(out, "h2", "cta-title", title.as_deref());
            render_rich_text(out, rich_text);
            render_buttons(out, buttons);
            out.push_str("</div>");
        }
        PageBuilderSection::FaqAccordion {
            eyebrow,
            title,
            subtitle,
            faqs,
            ..
        } => {
            out.push_str("<div class=\"faq-accordion\">");
            optional_tag(out, "p", "eyebrow", eyebrow.as_deref());
            optional_tag(out, "h2", "faq-title", title.as_deref());
            optional_tag(out, "p", "faq-subtitle", subtitle.as_deref());
            for faq in faqs {
                out.push_str("<details>");
                let _ = write!(
                    out,
                    "<summary>{}</summary>",
                    escape_html(faq.title.as_deref().unwrap_or(""))
                );
                render_rich_text(out, &faq.rich_text);
                out.push_str("</details>");
            }
            out.push_str("</div>");
        }
        PageBuilderSection::FeatureCardsIcon {
            eyebrow,
            title,
            rich_text,
            cards,
            ..
        } => {
            out.push_str("<div class=\"feature-cards\">");
            optional_tag(out, "p", "eyebrow", eyebrow.as_deref());
            optional_tag(out, "h2", "feature-cards-title", title.as_deref());
            render_rich_text(out, rich_text);
            for card in cards {
                out.push_str("<div class=\"feature-card\">");
                optional_tag(out, "h3", "feature-card-title", card.title.as_deref());
                render_rich_text(out, &card.rich_text);
                out.push_str("</div>");
            }
            out.push_str("</div>");
        }
        PageBuilderSection::Unsupported => {
            tracing::debug!("skipping unsupported page builder section");
        }
    }
}

fn optional_tag(out: &mut String, tag: &str, class: &str, text: Option<&str>) {
    if let Some(text) = text.filter(|t| !t.is_empty()) {
        let _ = write!(
            out,
            "<{tag} class=\"{class}\">{}</{tag}>",
            escape_html(text)
        );
    }
}

fn render_buttons(out: &mut String, buttons: &[Button]) {
    if buttons.is_empty() {
        return;
    }
    out.push_str("<div class=\"buttons\">");
    for button in buttons {
        let text = escape_html(button.text.as_deref().unwrap_or(""));
        let variant = escape_html(button.variant.as_deref().unwrap_or("default"));
        match button.href.as_deref().and_then(safe_href) {
            Some(href) => {
                let _ = write!(
                    out,
                    "<a class=\"button button-{variant}\" href=\"{href}\">{text}</a>"
                );
            }
            None => {
                let _ = write!(out, "<span class=\"button button-{variant}\">{text}</span>");
            }
        }
    }
    out.push_str("</div>");
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_renders_known_sections_and_skips_unknown() {
        let sections: Vec<PageBuilderSection> = serde_json::from_value(json!([
            {"_type": "cta", "title": "Join us", "buttons": [{"text": "Sign up", "href": "/signup"}]},
            {"_type": "mysteryBlock", "foo": 1},
            {"_type": "faqAccordion", "title": "FAQ", "faqs": [
                {"title": "Is it free?", "richText": [{"_type": "block", "children": [{"text": "Yes"}]}]}
            ]}
        ]))
        .unwrap();

        let mut out = String::new();
        render_page_builder(&mut out, &sections, "blogIndex", "blogIndex");

        assert!(out.starts_with("<section class=\"page-builder\" data-document-id=\"blogIndex\""));
        assert!(out.contains("<h2 class=\"cta-title\">Join us</h2>"));
        assert!(out.contains("<a class=\"button button-default\" href=\"/signup\">Sign up</a>"));
        assert!(out.contains("<summary>Is it free?</summary>"));
        assert!(out.contains("<p>Yes</p>"));
        assert!(!out.contains("mysteryBlock"));
    }

    #[test]
    fn test_empty_page_builder_renders_nothing() {
        let mut out = String::new();
        render_page_builder(&mut out, &[], "id", "type");
        assert!(out.is_empty());
    }
}
