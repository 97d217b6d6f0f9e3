use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::cms::rich_text::RichText;

/// An image as projected by the page queries: the asset's resolved url plus
/// optional alt text and dimensions.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub url: Option<String>,
    pub alt: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageRef {
    /// Image url asking the image CDN for the given dimensions.
    pub fn sized_url(&self, width: u32, height: Option<u32>) -> Option<String> {
        let base = self.url.as_deref()?;
        let separator = if base.contains('?') { '&' } else { '?' };
        Some(match height {
            Some(height) => format!("{base}{separator}w={width}&h={height}&fit=crop&auto=format"),
            None => format!("{base}{separator}w={width}&auto=format"),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Author {
    pub name: Option<String>,
    pub position: Option<String>,
    pub image: Option<ImageRef>,
}

/// Summary of a post as listed on the blog index.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogCard {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub published_at: Option<String>,
    pub image: Option<ImageRef>,
    pub authors: Option<Author>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogIndexDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub kind: String,
    pub title: Option<String>,
    pub description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub display_featured_blogs: bool,
    #[serde(default, deserialize_with = "featured_count")]
    pub featured_blogs_count: Option<usize>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blogs: Vec<BlogCard>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub page_builder: Vec<PageBuilderSection>,
}

impl BlogIndexDocument {
    /// Number of posts shown as featured cards, zero when disabled.
    pub fn featured_count(&self) -> usize {
        if self.display_featured_blogs {
            self.featured_blogs_count.unwrap_or(0)
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlogPostDocument {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_type")]
    pub kind: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub slug: Option<String>,
    pub published_at: Option<String>,
    pub image: Option<ImageRef>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: RichText,
    pub authors: Option<Author>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Button {
    pub text: Option<String>,
    pub href: Option<String>,
    pub variant: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Faq {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: RichText,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeatureCard {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub rich_text: RichText,
}

/// A page-builder section, discriminated by its CMS type.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "_type", rename_all = "camelCase")]
pub enum PageBuilderSection {
    #[serde(rename_all = "camelCase")]
    Hero {
        #[serde(rename = "_key")]
        key: Option<String>,
        badge: Option<String>,
        title: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        rich_text: RichText,
        image: Option<ImageRef>,
        #[serde(default, deserialize_with = "null_as_default")]
        buttons: Vec<Button>,
    },
    #[serde(rename_all = "camelCase")]
    Cta {
        #[serde(rename = "_key")]
        key: Option<String>,
        eyebrow: Option<String>,
        title: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        rich_text: RichText,
        #[serde(default, deserialize_with = "null_as_default")]
        buttons: Vec<Button>,
    },
    #[serde(rename_all = "camelCase")]
    FaqAccordion {
        #[serde(rename = "_key")]
        key: Option<String>,
        eyebrow: Option<String>,
        title: Option<String>,
        subtitle: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        faqs: Vec<Faq>,
    },
    #[serde(rename_all = "camelCase")]
    FeatureCardsIcon {
        #[serde(rename = "_key")]
        key: Option<String>,
        eyebrow: Option<String>,
        title: Option<String>,
        #[serde(default, deserialize_with = "null_as_default")]
        rich_text: RichText,
        #[serde(default, deserialize_with = "null_as_default")]
        cards: Vec<FeatureCard>,
    },
    #[serde(other)]
    Unsupported,
}

/// Slug entry for a blog post, as listed by the blog paths query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BlogPath {
    pub slug: String,
}

impl BlogPath {
    /// Takes the post segment out of a `/blog/<slug>` path. Empty slugs and
    /// paths without a third segment are skipped.
    pub fn from_slug(slug: &str) -> Option<BlogPath> {
        if slug.is_empty() {
            return None;
        }
        match slug.split('/').nth(2) {
            Some(path) if !path.is_empty() => Some(BlogPath {
                slug: path.to_string(),
            }),
            _ => None,
        }
    }
}

// The CMS sends explicit nulls for unset arrays and booleans.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// Stored as a string in the CMS; parsed leniently, anything unparsable means none.
fn featured_count<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Value::Number(n)) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        Some(Value::String(s)) => parse_leading_int(&s),
        _ => None,
    })
}

fn parse_leading_int(s: &str) -> Option<usize> {
    let digits: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_parses_blog_index_with_nulls() {
        let doc: BlogIndexDocument = serde_json::from_value(json!({
            "_id": "blogIndex",
            "_type": "blogIndex",
            "title": "Blog",
            "description": null,
            "displayFeaturedBlogs": null,
            "featuredBlogsCount": null,
            "blogs": null,
            "pageBuilder": null
        }))
        .unwrap();

        assert!(doc.blogs.is_empty());
        assert!(doc.page_builder.is_empty());
        assert_eq!(doc.featured_count(), 0);
    }

    #[test]
    fn test_featured_count_parsing() {
        let parse = |count: Value, display: bool| {
            let doc: BlogIndexDocument = serde_json::from_value(json!({
                "_id": "i", "_type": "blogIndex",
                "displayFeaturedBlogs": display,
                "featuredBlogsCount": count
            }))
            .unwrap();
            doc.featured_count()
        };

        assert_eq!(parse(json!("2"), true), 2);
        assert_eq!(parse(json!("3 posts"), true), 3);
        assert_eq!(parse(json!(1), true), 1);
        assert_eq!(parse(json!("many"), true), 0);
        assert_eq!(parse(json!("2"), false), 0);
    }

    #[test]
    fn test_page_builder_sections() {
        let sections: Vec<PageBuilderSection> = serde_json::from_value(json!([
            {"_type": "cta", "_key": "c1", "title": "Subscribe", "richText": null,
             "buttons": [{"text": "Go", "href": "/go"}]},
            {"_type": "faqAccordion", "title": "FAQ", "faqs": [{"title": "Why?", "richText": []}]},
            {"_type": "imageLinkCards", "cards": []}
        ]))
        .unwrap();

        assert!(matches!(&sections[0], PageBuilderSection::Cta { buttons, .. } if buttons.len() == 1));
        assert!(matches!(&sections[1], PageBuilderSection::FaqAccordion { faqs, .. } if faqs.len() == 1));
        assert_eq!(sections[2], PageBuilderSection::Unsupported);
    }

    #[test]
    fn test_blog_post_requires_id() {
        let result: Result<BlogPostDocument, _> =
            serde_json::from_value(json!({"_type": "blog", "title": "x"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_blog_path_from_slug() {
        assert_eq!(
            BlogPath::from_slug("/blog/hello-world"),
            Some(BlogPath {
                slug: "hello-world".to_string()
            })
        );
        assert_eq!(BlogPath::from_slug(""), None);
        assert_eq!(BlogPath::from_slug("/blog"), None);
        assert_eq!(BlogPath::from_slug("/blog/"), None);
    }

    #[test]
    fn test_sized_image_url() {
        let image = ImageRef {
            url: Some("https://cdn.sanity.io/images/p/d/abc-1600x900.png".to_string()),
            alt: None,
            width: None,
            height: None,
        };
        assert_eq!(
            image.sized_url(300, Some(250)).unwrap(),
            "https://cdn.sanity.io/images/p/d/abc-1600x900.png?w=300&h=250&fit=crop&auto=format"
        );
        assert_eq!(
            image.sized_url(1600, None).unwrap(),
            "https://cdn.sanity.io/images/p/d/abc-1600x900.png?w=1600&auto=format"
        );
    }
}
