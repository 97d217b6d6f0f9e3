use std::future::ready;
use std::sync::Arc;

use axum::{http::StatusCode, routing::get, Router};
use tower_http::trace::TraceLayer;

use crate::api::PageError;
use crate::cms::ContentSource;
use crate::edge::edge_gate;
use crate::flags::flag_resolver::FlagClientStatus;
use crate::flags::FlagResolver;
use crate::pages::{blog_index, blog_paths, blog_post, SiteSettings};
use crate::prometheus::{setup_metrics_recorder, track_metrics};

#[derive(Clone)]
pub struct State {
    pub cms: Arc<dyn ContentSource + Send + Sync>,
    pub flags: Arc<FlagResolver>,
    pub site: SiteSettings,
}

pub fn router(
    cms: Arc<dyn ContentSource + Send + Sync>,
    flags: Arc<FlagResolver>,
    site: SiteSettings,
    metrics: bool,
) -> Router {
    let state = State {
        cms,
        flags: flags.clone(),
        site,
    };

    // liveness/readiness checks
    let status_router = Router::new()
        .route("/_readiness", get(move || readiness(flags.clone())))
        .route("/_liveness", get(|| ready("ok")));

    let pages_router = Router::new()
        .route("/blog", get(blog_index::blog_index))
        .route("/blog/:slug", get(blog_post::blog_post))
        .route("/api/blog-paths", get(blog_paths::blog_paths))
        .fallback(not_found);

    let router = Router::new()
        .merge(status_router)
        .merge(pages_router)
        .layer(axum::middleware::from_fn(edge_gate))
        .layer(TraceLayer::new_for_http())
        .layer(axum::middleware::from_fn(track_metrics))
        .with_state(state);

    // Global metrics recorders can play poorly with tests, so only install
    // one when asked to
    if !metrics {
        return router;
    }
    match setup_metrics_recorder() {
        Ok(recorder_handle) => {
            router.route("/metrics", get(move || ready(recorder_handle.render())))
        }
        Err(e) => {
            tracing::error!("failed to install metrics recorder: {}", e);
            router
        }
    }
}

pub async fn readiness(flags: Arc<FlagResolver>) -> (StatusCode, String) {
    match flags.status() {
        FlagClientStatus::Initializing => (
            StatusCode::SERVICE_UNAVAILABLE,
            "flag client initializing".to_string(),
        ),
        status => (StatusCode::OK, format!("ready (flags: {:?})", status)),
    }
}

async fn not_found() -> PageError {
    PageError::NotFound
}
