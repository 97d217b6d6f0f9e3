use axum::extract::{Path, State};
use axum::response::Html;
use axum_extra::extract::cookie::CookieJar;
use serde_json::Value;
use tracing::instrument;

use crate::api::PageError;
use crate::cms::documents::BlogPostDocument;
use crate::cms::{fetch_document, queries};
use crate::flags::EvaluationContext;
use crate::identity;
use crate::metrics_consts::PAGES_RENDERED_COUNTER;
use crate::pages::{render_author, render_header, ExperimentArms, ExperimentDefaults, SiteSettings};
use crate::render::rich_text::{render_rich_text, render_table_of_contents, table_of_contents};
use crate::render::{document, image, PageMetadata};
use crate::router;

pub fn defaults() -> ExperimentDefaults {
    ExperimentDefaults {
        image: "control".into(),
        name: false.into(),
    }
}

pub fn post_path(slug: &str) -> String {
    format!("/blog/{}", slug)
}

#[instrument(skip_all)]
pub async fn blog_post(
    State(state): State<router::State>,
    Path(slug): Path<String>,
    jar: CookieJar,
) -> Result<Html<String>, PageError> {
    let context = EvaluationContext::user(identity::get_user_id(&jar));
    let arms = ExperimentArms::assign(&state.flags, &context, defaults()).await;

    let mut params = arms.query_params();
    params.insert("slug".to_string(), Value::from(post_path(&slug)));

    let query = queries::blog_slug_page_query();
    let post = fetch_document::<BlogPostDocument>(state.cms.as_ref(), &query, &params)
        .await?
        .ok_or(PageError::NotFound)?;

    metrics::counter!(PAGES_RENDERED_COUNTER, "page" => "blog_post").increment(1);
    Ok(Html(render_blog_post(&post, &state.site)))
}

pub fn render_blog_post(post: &BlogPostDocument, site: &SiteSettings) -> String {
    let metadata = PageMetadata::new(
        post.title.as_deref(),
        post.description.as_deref(),
        &site.name,
        &site.description,
    );
    let title = post.title.as_deref().unwrap_or_default();
    let mut out = String::new();

    out.push_str("<div class=\"container blog-post\"><div class=\"blog-post-grid\"><main>");
    render_header(&mut out, post.title.as_deref(), post.description.as_deref());
    if let Some(cover) = &post.image {
        out.push_str("<div class=\"blog-post-image\">");
        image(&mut out, cover, title, 1600, Some(900), "cover-image");
        out.push_str("</div>");
    }
    render_rich_text(&mut out, &post.rich_text);
    out.push_str("</main>");

    out.push_str("<aside>");
    if let Some(author) = &post.authors {
        render_author(&mut out, author, title);
    }
    out.push_str("<div class=\"sticky-toc\">");
    render_table_of_contents(&mut out, &table_of_contents(&post.rich_text));
    out.push_str("</div></aside>");
    out.push_str("</div></div>");

    document(&metadata, &out)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde_json::json;

    use super::*;
    use crate::cms::MockContentSource;
    use crate::flags::FlagResolver;

    fn site() -> SiteSettings {
        SiteSettings {
            name: "Acme".to_string(),
            description: "".to_string(),
        }
    }

    fn state_with(cms: MockContentSource) -> router::State {
        router::State {
            cms: Arc::new(cms),
            flags: Arc::new(FlagResolver::disabled()),
            site: site(),
        }
    }

    fn post() -> Value {
        json!({
            "_id": "post-1",
            "_type": "blog",
            "title": "Hello world",
            "description": "A first post",
            "image": {"url": "https://cdn.example.com/cover.png"},
            "richText": [
                {"_type": "block", "style": "h2", "children": [{"text": "Why"}]},
                {"_type": "block", "children": [{"text": "Because."}]}
            ],
            "authors": {"name": "Sam Doe", "image": {"url": "https://cdn.example.com/sam.png"}}
        })
    }

    #[test]
    fn test_renders_full_post() {
        let doc: BlogPostDocument = serde_json::from_value(post()).unwrap();
        let html = render_blog_post(&doc, &site());

        assert!(html.contains("<h1>Hello world</h1>"));
        assert!(html.contains("<p class=\"description\">A first post</p>"));
        assert!(html.contains("cover.png?w=1600&amp;h=900"));
        assert!(html.contains("<h2 id=\"why\">Why</h2>"));
        assert!(html.contains("<p>Because.</p>"));
        assert!(html.contains("<h3 class=\"author-name\">Sam Doe</h3>"));
        assert!(html.contains("<a href=\"#why\">Why</a>"));
    }

    #[test]
    fn test_post_without_image_or_author() {
        let doc: BlogPostDocument = serde_json::from_value(json!({
            "_id": "post-2", "_type": "blog", "title": "Bare", "richText": null
        }))
        .unwrap();
        let html = render_blog_post(&doc, &site());

        assert!(html.contains("<h1>Bare</h1>"));
        assert!(!html.contains("<img"));
        assert!(!html.contains("author"));
        assert!(!html.contains("table-of-content"));
    }

    #[tokio::test]
    async fn test_missing_post_is_not_found() {
        let cms = MockContentSource::new().result_ret(Value::Null);
        let state = state_with(cms.clone());

        let result = blog_post(
            State(state),
            Path("does-not-exist".to_string()),
            CookieJar::new(),
        )
        .await;

        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let calls = cms.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].get("slug"), Some(&json!("/blog/does-not-exist")));
        assert_eq!(calls[0].get("nameVariation"), Some(&json!(false)));
        assert_eq!(calls[0].get("imageVariation"), Some(&json!("control")));
    }

    #[tokio::test]
    async fn test_cms_failure_is_bad_gateway() {
        let state = state_with(MockContentSource::new().failing());

        let result = blog_post(State(state), Path("hello".to_string()), CookieJar::new()).await;
        let response = result.unwrap_err().into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }

    #[tokio::test]
    async fn test_existing_post_renders() {
        let state = state_with(MockContentSource::new().result_ret(post()));

        let Html(html) = blog_post(State(state), Path("hello".to_string()), CookieJar::new())
            .await
            .unwrap();
        assert!(html.contains("<h1>Hello world</h1>"));
    }
}
