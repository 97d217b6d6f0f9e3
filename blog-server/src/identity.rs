use axum_extra::extract::cookie::{Cookie, CookieJar};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the cookie carrying the visitor identity used for experiment bucketing.
pub const IDENTITY_COOKIE: &str = "ab-test";

/// Cookie payload, stored as `{"userId": "<uuid>"}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisitorIdentity {
    pub user_id: String,
}

impl VisitorIdentity {
    pub fn generate() -> Self {
        VisitorIdentity {
            user_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Stages a cookie carrying a freshly minted identity when the request has
/// none. An existing cookie is never replaced, even if its value is malformed.
pub fn ensure_identity(jar: &CookieJar) -> Option<Cookie<'static>> {
    if jar.get(IDENTITY_COOKIE).is_some() {
        return None;
    }

    let identity = VisitorIdentity::generate();
    let value = match serde_json::to_string(&identity) {
        Ok(value) => value,
        Err(e) => {
            tracing::error!("failed to encode visitor identity: {}", e);
            return None;
        }
    };

    Some(Cookie::build((IDENTITY_COOKIE, value)).path("/").build())
}

/// Reads the visitor id from the identity cookie, if present and well-formed.
pub fn get_user_id(jar: &CookieJar) -> Option<String> {
    let cookie = jar.get(IDENTITY_COOKIE)?;
    match serde_json::from_str::<VisitorIdentity>(cookie.value()) {
        Ok(identity) => Some(identity.user_id),
        Err(e) => {
            tracing::debug!("ignoring malformed identity cookie: {}", e);
            None
        }
    }
}
