use axum::extract::State;
use axum::Json;
use serde_json::Value;
use tracing::instrument;

use crate::api::PageError;
use crate::cms::documents::BlogPath;
use crate::cms::{fetch_document, queries, QueryParams};
use crate::router;

/// Lists the slug of every published post, for prerendering and sitemaps.
#[instrument(skip_all)]
pub async fn blog_paths(State(state): State<router::State>) -> Result<Json<Vec<BlogPath>>, PageError> {
    let slugs = fetch_document::<Vec<Value>>(
        state.cms.as_ref(),
        queries::BLOG_PATHS_QUERY,
        &QueryParams::new(),
    )
    .await?
    .unwrap_or_default();

    Ok(Json(collect_paths(&slugs)))
}

// Entries that are not strings, or not shaped like `/blog/<slug>`, are dropped.
fn collect_paths(slugs: &[Value]) -> Vec<BlogPath> {
    slugs
        .iter()
        .filter_map(Value::as_str)
        .filter_map(BlogPath::from_slug)
        .collect()
}
