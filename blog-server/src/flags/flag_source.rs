use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use thiserror::Error;
use tracing::instrument;

use crate::flags::flag_definitions::FlagSnapshot;

const LATEST_ALL_PATH: &str = "/sdk/latest-all";

#[derive(Error, Debug)]
pub enum FlagSourceError {
    #[error("failed to build flag service client: {0}")]
    ClientBuildError(String),
    #[error("flag service request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("flag service rejected the sdk key")]
    Unauthorized,
    #[error("flag service answered with status {0}")]
    UnexpectedStatus(u16),
}

/// Where flag definitions come from.
#[async_trait]
pub trait FlagSource {
    async fn fetch_snapshot(&self) -> Result<FlagSnapshot, FlagSourceError>;
}

/// Polls the flag service's server-side endpoint for every flag definition.
pub struct HttpFlagSource {
    client: reqwest::Client,
    endpoint: String,
    sdk_key: String,
}

impl HttpFlagSource {
    pub fn new(
        base_url: &str,
        sdk_key: String,
        timeout: Duration,
    ) -> Result<HttpFlagSource, FlagSourceError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FlagSourceError::ClientBuildError(e.to_string()))?;

        Ok(HttpFlagSource {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), LATEST_ALL_PATH),
            sdk_key,
        })
    }
}

#[async_trait]
impl FlagSource for HttpFlagSource {
    #[instrument(skip_all)]
    async fn fetch_snapshot(&self) -> Result<FlagSnapshot, FlagSourceError> {
        let response = self
            .client
            .get(&self.endpoint)
            .header(AUTHORIZATION, &self.sdk_key)
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN
        {
            return Err(FlagSourceError::Unauthorized);
        }
        if !status.is_success() {
            return Err(FlagSourceError::UnexpectedStatus(status.as_u16()));
        }

        let snapshot = response.json::<FlagSnapshot>().await?;
        tracing::debug!(flags = snapshot.len(), "fetched flag definitions");
        Ok(snapshot)
    }
}

/// In-memory source for tests. Can be made to fail or to never answer.
#[derive(Clone, Default)]
pub struct MockFlagSource {
    snapshot: Arc<Mutex<Option<FlagSnapshot>>>,
    hang: bool,
    fetches: Arc<Mutex<usize>>,
}

impl MockFlagSource {
    pub fn new() -> MockFlagSource {
        MockFlagSource::default()
    }

    pub fn snapshot_ret(mut self, snapshot: FlagSnapshot) -> Self {
        self.snapshot = Arc::new(Mutex::new(Some(snapshot)));
        self
    }

    /// Never resolves, like a service that accepts the connection and stalls.
    pub fn hanging(mut self) -> Self {
        self.hang = true;
        self
    }

    pub fn set_snapshot(&self, snapshot: FlagSnapshot) {
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = Some(snapshot);
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().map(|count| *count).unwrap_or_default()
    }
}

#[async_trait]
impl FlagSource for MockFlagSource {
    async fn fetch_snapshot(&self) -> Result<FlagSnapshot, FlagSourceError> {
        if let Ok(mut count) = self.fetches.lock() {
            *count += 1;
        }
        if self.hang {
            futures::future::pending::<()>().await;
        }
        let snapshot = self.snapshot.lock().ok().and_then(|guard| guard.clone());
        snapshot.ok_or(FlagSourceError::UnexpectedStatus(503))
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    #[tokio::test]
    async fn test_fetches_snapshot_with_sdk_key() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/sdk/latest-all")
                .header("authorization", "sdk-test-key");
            then.status(200).json_body(json!({
                "flags": {
                    "name": {"key": "name", "on": true, "variations": ["long", "short"],
                             "fallthrough": {"variation": 1}}
                },
                "segments": {}
            }));
        });

        let source =
            HttpFlagSource::new(&server.base_url(), "sdk-test-key".to_string(), Duration::from_secs(5))
                .unwrap();
        let snapshot = source.fetch_snapshot().await.unwrap();

        mock.assert();
        assert!(snapshot.get("name").is_some());
    }

    #[tokio::test]
    async fn test_rejected_key_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/sdk/latest-all");
            then.status(401);
        });

        let source =
            HttpFlagSource::new(&server.base_url(), "bad-key".to_string(), Duration::from_secs(5))
                .unwrap();
        let result = source.fetch_snapshot().await;
        assert!(matches!(result, Err(FlagSourceError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/sdk/latest-all");
            then.status(500);
        });

        let source =
            HttpFlagSource::new(&server.base_url(), "key".to_string(), Duration::from_secs(5))
                .unwrap();
        let result = source.fetch_snapshot().await;
        assert!(matches!(result, Err(FlagSourceError::UnexpectedStatus(500))));
    }
}
