use axum::{
    extract::Request,
    http::{header::COOKIE, HeaderMap, HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::CookieJar;

use crate::identity;
use crate::metrics_consts::IDENTITY_COOKIES_ISSUED_COUNTER;

pub const SEC_FETCH_DEST: HeaderName = HeaderName::from_static("sec-fetch-dest");

/// True for full document loads, as opposed to scripts, images and other
/// sub-resources.
pub fn is_document_request(headers: &HeaderMap) -> bool {
    headers
        .get(&SEC_FETCH_DEST)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|dest| dest == "document")
}

/// Gives every visitor an identity cookie before any page is served.
/// This is the only place the identity cookie is written.
///
/// A freshly staged cookie is also appended to the request's cookies, so the
/// page behind the gate buckets the visitor with the identity it is about to
/// receive.
pub async fn edge_gate(jar: CookieJar, mut request: Request, next: Next) -> Response {
    if !is_document_request(request.headers()) {
        return next.run(request).await;
    }

    match identity::ensure_identity(&jar) {
        Some(cookie) => {
            tracing::debug!("issuing identity cookie to new visitor");
            metrics::counter!(IDENTITY_COOKIES_ISSUED_COUNTER).increment(1);
            match HeaderValue::from_str(&cookie.encoded().stripped().to_string()) {
                Ok(value) => {
                    request.headers_mut().append(COOKIE, value);
                }
                Err(e) => tracing::warn!("could not forward identity cookie: {}", e),
            }
            let response = next.run(request).await;
            (jar.add(cookie), response).into_response()
        }
        None => next.run(request).await,
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{header::SET_COOKIE, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::identity::VisitorIdentity;

    fn app() -> Router {
        Router::new()
            .route("/blog", get(|| async { "ok" }))
            .route(
                "/whoami",
                get(|jar: CookieJar| async move { identity::get_user_id(&jar).unwrap_or_default() }),
            )
            .layer(middleware::from_fn(edge_gate))
    }

    fn identity_from_set_cookie(value: &HeaderValue) -> VisitorIdentity {
        let raw = value.to_str().unwrap();
        let cookie = axum_extra::extract::cookie::Cookie::parse_encoded(raw.to_string()).unwrap();
        assert_eq!(cookie.name(), identity::IDENTITY_COOKIE);
        serde_json::from_str(cookie.value()).unwrap()
    }

    #[test]
    fn test_document_detection() {
        let mut headers = HeaderMap::new();
        assert!(!is_document_request(&headers));

        headers.insert(SEC_FETCH_DEST, HeaderValue::from_static("image"));
        assert!(!is_document_request(&headers));

        headers.insert(SEC_FETCH_DEST, HeaderValue::from_static("document"));
        assert!(is_document_request(&headers));
    }

    #[tokio::test]
    async fn test_document_request_without_cookie_gets_identity() {
        let request = Request::builder()
            .uri("/blog")
            .header("sec-fetch-dest", "document")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookies: Vec<_> = response.headers().get_all(SET_COOKIE).iter().collect();
        assert_eq!(cookies.len(), 1);
        let identity = identity_from_set_cookie(cookies[0]);
        assert!(uuid::Uuid::parse_str(&identity.user_id).is_ok());
    }

    #[tokio::test]
    async fn test_handler_sees_identity_staged_on_same_request() {
        let request = Request::builder()
            .uri("/whoami")
            .header("sec-fetch-dest", "document")
            .header(COOKIE, "theme=dark")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        let issued = identity_from_set_cookie(response.headers().get(SET_COOKIE).unwrap());

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(String::from_utf8(body.to_vec()).unwrap(), issued.user_id);
    }

    #[tokio::test]
    async fn test_document_request_with_cookie_is_untouched() {
        let request = Request::builder()
            .uri("/blog")
            .header("sec-fetch-dest", "document")
            .header(COOKIE, "ab-test=%7B%22userId%22%3A%22abc%22%7D")
            .body(Body::empty())
            .unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_sub_resource_requests_are_skipped() {
        for dest in ["image", "script", "style", "empty"] {
            let request = Request::builder()
                .uri("/blog")
                .header("sec-fetch-dest", dest)
                .body(Body::empty())
                .unwrap();

            let response = app().oneshot(request).await.unwrap();
            assert!(response.headers().get(SET_COOKIE).is_none(), "dest {dest}");
        }
    }

    #[tokio::test]
    async fn test_missing_fetch_dest_is_skipped() {
        let request = Request::builder().uri("/blog").body(Body::empty()).unwrap();

        let response = app().oneshot(request).await.unwrap();
        assert!(response.headers().get(SET_COOKIE).is_none());
    }
}
