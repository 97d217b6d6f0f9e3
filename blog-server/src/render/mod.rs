pub mod page_builder;
pub mod rich_text;

use std::fmt::Write;

use crate::cms::documents::ImageRef;

/// Title and description for the document head.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
}

impl PageMetadata {
    /// Document values win; site defaults fill in whatever is missing.
    pub fn new(
        title: Option<&str>,
        description: Option<&str>,
        site_name: &str,
        site_description: &str,
    ) -> Self {
        let title = match title.map(str::trim).filter(|t| !t.is_empty()) {
            Some(title) if title != site_name => format!("{} | {}", title, site_name),
            _ => site_name.to_string(),
        };
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .unwrap_or(site_description)
            .to_string();
        PageMetadata { title, description }
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Only http(s), mailto, relative and fragment urls make it into an href.
pub fn safe_href(href: &str) -> Option<String> {
    let trimmed = href.trim();
    let lower = trimmed.to_ascii_lowercase();
    let allowed = lower.starts_with("http://")
        || lower.starts_with("https://")
        || lower.starts_with("mailto:")
        || lower.starts_with('/')
        || lower.starts_with('#');
    allowed.then(|| escape_html(trimmed))
}

/// Wraps a page body in the html document shell.
pub fn document(metadata: &PageMetadata, body: &str) -> String {
    let title = escape_html(&metadata.title);
    let description = escape_html(&metadata.description);
    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n\
         <meta charset=\"utf-8\">\n\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n\
         <title>{title}</title>\n\
         <meta name=\"description\" content=\"{description}\">\n\
         <meta property=\"og:title\" content=\"{title}\">\n\
         <meta property=\"og:description\" content=\"{description}\">\n\
         </head>\n<body>\n{body}\n</body>\n</html>\n"
    )
}

pub fn image(
    out: &mut String,
    image: &ImageRef,
    fallback_alt: &str,
    width: u32,
    height: Option<u32>,
    class: &str,
) {
    let Some(src) = image.sized_url(width, height) else {
        return;
    };
    let alt = image.alt.as_deref().unwrap_or(fallback_alt);
    let _ = write!(
        out,
        "<img src=\"{}\" alt=\"{}\" width=\"{}\"",
        escape_html(&src),
        escape_html(alt),
        width
    );
    if let Some(height) = height {
        let _ = write!(out, " height=\"{}\"", height);
    }
    let _ = write!(out, " class=\"{}\">", class);
}

/// Lowercase, dash-separated anchor id for a heading.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}
