pub mod blog_index;
pub mod blog_paths;
pub mod blog_post;

use std::fmt::Write;

use serde_json::Value;

use crate::cms::documents::{Author, BlogCard};
use crate::cms::QueryParams;
use crate::config::Config;
use crate::flags::{EvaluationContext, FlagResolver, FlagValue};
use crate::render::{escape_html, image, safe_href};

pub const IMAGE_FLAG: &str = "image";
pub const NAME_FLAG: &str = "name";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteSettings {
    pub name: String,
    pub description: String,
}

impl SiteSettings {
    pub fn from_config(config: &Config) -> Self {
        SiteSettings {
            name: config.site_name.clone(),
            description: config.site_description.clone(),
        }
    }
}

/// Variations served when a visitor can't be bucketed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentDefaults {
    pub image: FlagValue,
    pub name: FlagValue,
}

/// The experiment arms a visitor was assigned for one page render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentArms {
    pub image_variation: FlagValue,
    pub name_variation: FlagValue,
}

impl ExperimentArms {
    pub async fn assign(
        resolver: &FlagResolver,
        context: &EvaluationContext,
        defaults: ExperimentDefaults,
    ) -> ExperimentArms {
        let (image_variation, name_variation) = tokio::join!(
            resolver.resolve(IMAGE_FLAG, context, defaults.image),
            resolver.resolve(NAME_FLAG, context, defaults.name),
        );
        tracing::debug!(
            image = %image_variation,
            name = %name_variation,
            "assigned experiment arms"
        );
        ExperimentArms {
            image_variation,
            name_variation,
        }
    }

    /// CMS query parameters carrying the flag keys and assigned variations.
    pub fn query_params(&self) -> QueryParams {
        let mut params = QueryParams::new();
        params.insert("imageFlag".to_string(), Value::from(IMAGE_FLAG));
        params.insert("nameFlag".to_string(), Value::from(NAME_FLAG));
        params.insert("imageVariation".to_string(), self.image_variation.to_json());
        params.insert("nameVariation".to_string(), self.name_variation.to_json());
        params
    }
}

pub(crate) fn render_header(out: &mut String, title: Option<&str>, description: Option<&str>) {
    out.push_str("<header class=\"page-header\">");
    let _ = write!(
        out,
        "<h1>{}</h1>",
        escape_html(title.unwrap_or_default())
    );
    if let Some(description) = description {
        let _ = write!(out, "<p class=\"description\">{}</p>", escape_html(description));
    }
    out.push_str("</header>");
}

pub(crate) fn render_author(out: &mut String, author: &Author, fallback_alt: &str) {
    out.push_str("<div class=\"author\">");
    if let Some(name) = author.name.as_deref() {
        let _ = write!(out, "<h3 class=\"author-name\">{}</h3>", escape_html(name));
    }
    if let Some(position) = author.position.as_deref() {
        let _ = write!(out, "<p class=\"author-position\">{}</p>", escape_html(position));
    }
    if let Some(portrait) = &author.image {
        image(out, portrait, fallback_alt, 300, Some(250), "author-image");
    }
    out.push_str("</div>");
}

pub(crate) fn render_blog_card(out: &mut String, blog: &BlogCard, featured: bool) {
    let class = if featured { "blog-card featured" } else { "blog-card" };
    let title = blog.title.as_deref().unwrap_or_default();
    let _ = write!(out, "<article class=\"{}\" data-id=\"{}\">", class, escape_html(&blog.id));

    if let Some(cover) = &blog.image {
        let (width, height) = if featured { (1200, 630) } else { (800, 450) };
        image(out, cover, title, width, Some(height), "blog-card-image");
    }

    let heading = if featured { "h2" } else { "h3" };
    match blog.slug.as_deref().and_then(safe_href) {
        Some(href) => {
            let _ = write!(
                out,
                "<{heading}><a href=\"{href}\">{}</a></{heading}>",
                escape_html(title)
            );
        }
        None => {
            let _ = write!(out, "<{heading}>{}</{heading}>", escape_html(title));
        }
    }
    if let Some(published_at) = blog.published_at.as_deref() {
        let _ = write!(
            out,
            "<time datetime=\"{0}\">{0}</time>",
            escape_html(published_at)
        );
    }
    if let Some(description) = blog.description.as_deref() {
        let _ = write!(out, "<p>{}</p>", escape_html(description));
    }
    if let Some(author) = &blog.authors {
        render_author(out, author, title);
    }
    out.push_str("</article>");
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::flags::flag_source::MockFlagSource;

    #[tokio::test]
    async fn test_disabled_flags_assign_defaults() {
        let resolver = FlagResolver::disabled();
        let context = EvaluationContext::user(Some("visitor-1".to_string()));
        let defaults = ExperimentDefaults {
            image: "control".into(),
            name: false.into(),
        };

        let arms = ExperimentArms::assign(&resolver, &context, defaults).await;
        assert_eq!(arms.image_variation, FlagValue::from("control"));
        assert_eq!(arms.name_variation, FlagValue::from(false));

        let params = arms.query_params();
        assert_eq!(params.get("imageFlag"), Some(&json!("image")));
        assert_eq!(params.get("nameFlag"), Some(&json!("name")));
        assert_eq!(params.get("imageVariation"), Some(&json!("control")));
        assert_eq!(params.get("nameVariation"), Some(&json!(false)));
    }

    #[tokio::test]
    async fn test_assigned_variations_flow_into_params() {
        let snapshot = serde_json::from_value(json!({
            "flags": {
                "image": {"key": "image", "on": true, "variations": ["control", "hidden"],
                          "fallthrough": {"variation": 1}},
                "name": {"key": "name", "on": true, "variations": ["long", "short"],
                         "fallthrough": {"variation": 1}}
            }
        }))
        .unwrap();
        let source = MockFlagSource::new().snapshot_ret(snapshot);
        let resolver = FlagResolver::new(Some(Arc::new(source)), Duration::from_secs(5), None);
        let context = EvaluationContext::user(Some("visitor-1".to_string()));
        let defaults = ExperimentDefaults {
            image: "control".into(),
            name: "long".into(),
        };

        let arms = ExperimentArms::assign(&resolver, &context, defaults).await;
        let params = arms.query_params();
        assert_eq!(params.get("imageVariation"), Some(&json!("hidden")));
        assert_eq!(params.get("nameVariation"), Some(&json!("short")));
    }

    #[test]
    fn test_blog_card_links_to_post() {
        let card: BlogCard = serde_json::from_value(json!({
            "_id": "post-1",
            "title": "Hello & welcome",
            "slug": "/blog/hello",
            "description": "First post",
            "authors": {"name": "Sam"}
        }))
        .unwrap();

        let mut out = String::new();
        render_blog_card(&mut out, &card, false);
        assert!(out.contains("<h3><a href=\"/blog/hello\">Hello &amp; welcome</a></h3>"));
        assert!(out.contains("<h3 class=\"author-name\">Sam</h3>"));
        assert!(!out.contains("<img"));
    }
}
