use axum::extract::State;
use axum::response::Html;
use axum_extra::extract::cookie::CookieJar;
use tracing::instrument;

use crate::api::PageError;
use crate::cms::documents::BlogIndexDocument;
use crate::cms::{fetch_document, queries};
use crate::flags::EvaluationContext;
use crate::identity;
use crate::metrics_consts::PAGES_RENDERED_COUNTER;
use crate::pages::{
    render_blog_card, render_header, ExperimentArms, ExperimentDefaults, SiteSettings,
};
use crate::render::page_builder::render_page_builder;
use crate::render::{document, PageMetadata};
use crate::router;

pub const EMPTY_STATE_MESSAGE: &str = "No blog posts available at the moment.";

pub fn defaults() -> ExperimentDefaults {
    ExperimentDefaults {
        image: "control".into(),
        name: "long".into(),
    }
}

#[instrument(skip_all)]
pub async fn blog_index(
    State(state): State<router::State>,
    jar: CookieJar,
) -> Result<Html<String>, PageError> {
    let context = EvaluationContext::user(identity::get_user_id(&jar));
    let arms = ExperimentArms::assign(&state.flags, &context, defaults()).await;

    let query = queries::blog_index_page_query();
    let page = fetch_document::<BlogIndexDocument>(state.cms.as_ref(), &query, &arms.query_params())
        .await
        .map_err(|e| {
            // Any failure to load the index is shown as a missing page
            tracing::error!("failed to load blog index: {}", e);
            PageError::NotFound
        })?
        .ok_or(PageError::NotFound)?;

    metrics::counter!(PAGES_RENDERED_COUNTER, "page" => "blog_index").increment(1);
    Ok(Html(render_blog_index(&page, &state.site)))
}

pub fn render_blog_index(page: &BlogIndexDocument, site: &SiteSettings) -> String {
    let metadata = PageMetadata::new(
        page.title.as_deref(),
        page.description.as_deref(),
        &site.name,
        &site.description,
    );
    let mut out = String::new();

    if page.blogs.is_empty() {
        out.push_str("<main class=\"container blog-index empty\">");
        render_header(&mut out, page.title.as_deref(), page.description.as_deref());
        out.push_str("<div class=\"empty-state\"><p>");
        out.push_str(EMPTY_STATE_MESSAGE);
        out.push_str("</p></div>");
        render_page_builder(&mut out, &page.page_builder, &page.id, &page.kind);
        out.push_str("</main>");
        return document(&metadata, &out);
    }

    let featured_count = page.featured_count().min(page.blogs.len());
    let (featured, remaining) = page.blogs.split_at(featured_count);

    out.push_str("<main class=\"blog-index\"><div class=\"container\">");
    render_header(&mut out, page.title.as_deref(), page.description.as_deref());
    if !featured.is_empty() {
        out.push_str("<div class=\"featured-blogs\">");
        for blog in featured {
            render_blog_card(&mut out, blog, true);
        }
        out.push_str("</div>");
    }
    if !remaining.is_empty() {
        out.push_str("<div class=\"blog-grid\">");
        for blog in remaining {
            render_blog_card(&mut out, blog, false);
        }
        out.push_str("</div>");
    }
    out.push_str("</div>");
    render_page_builder(&mut out, &page.page_builder, &page.id, &page.kind);
    out.push_str("</main>");

    document(&metadata, &out)
}
