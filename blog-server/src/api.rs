use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use thiserror::Error;

use crate::cms::CmsError;
use crate::render::{document, PageMetadata};

#[derive(Error, Debug)]
pub enum PageError {
    #[error("page not found")]
    NotFound,
    #[error("content unavailable: {0}")]
    Cms(#[from] CmsError),
}

impl PageError {
    pub fn status(&self) -> StatusCode {
        match self {
            PageError::NotFound => StatusCode::NOT_FOUND,
            PageError::Cms(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (title, message) = match self {
            PageError::NotFound => (
                "Page not found",
                "The page you are looking for does not exist.",
            ),
            PageError::Cms(e) => {
                tracing::error!("failed to load page content: {}", e);
                (
                    "Something went wrong",
                    "This page could not be loaded right now, please try again later.",
                )
            }
        };

        let metadata = PageMetadata {
            title: title.to_string(),
            description: message.to_string(),
        };
        let body = format!(
            "<main class=\"error-page\"><h1>{}</h1><p>{}</p><a href=\"/\">Go home</a></main>",
            title, message
        );
        (status, Html(document(&metadata, &body))).into_response()
    }
}
