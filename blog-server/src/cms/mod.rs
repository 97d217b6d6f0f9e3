pub mod documents;
pub mod queries;
pub mod rich_text;
pub mod sanity;

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;

/// Named query parameters, sent to the CMS as JSON values.
pub type QueryParams = BTreeMap<String, Value>;

#[derive(Error, Debug)]
pub enum CmsError {
    #[error("failed to build cms client: {0}")]
    ClientBuildError(String),
    #[error("invalid cms query url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("cms request failed: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("cms answered with status {status}: {message}")]
    QueryError { status: u16, message: String },
    #[error("cms returned a document that does not match the expected shape: {0}")]
    InvalidDocument(#[from] serde_json::Error),
}

/// A source of CMS documents. `Ok(None)` means the query matched nothing.
#[async_trait]
pub trait ContentSource {
    async fn fetch(&self, query: &str, params: &QueryParams) -> Result<Option<Value>, CmsError>;
}

/// Runs a query and validates the result into a typed document.
pub async fn fetch_document<T: DeserializeOwned>(
    source: &(dyn ContentSource + Send + Sync),
    query: &str,
    params: &QueryParams,
) -> Result<Option<T>, CmsError> {
    match source.fetch(query, params).await? {
        None | Some(Value::Null) => Ok(None),
        Some(raw) => Ok(Some(serde_json::from_value(raw)?)),
    }
}

/// Canned CMS for tests: answers every query with the configured result and
/// remembers the parameters it was called with.
#[derive(Clone, Default)]
pub struct MockContentSource {
    result: Option<Value>,
    fail: bool,
    calls: Arc<Mutex<Vec<QueryParams>>>,
}

impl MockContentSource {
    pub fn new() -> MockContentSource {
        MockContentSource::default()
    }

    pub fn result_ret(mut self, result: Value) -> Self {
        self.result = Some(result);
        self
    }

    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<QueryParams> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ContentSource for MockContentSource {
    async fn fetch(&self, _query: &str, params: &QueryParams) -> Result<Option<Value>, CmsError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(params.clone());
        }
        if self.fail {
            return Err(CmsError::QueryError {
                status: 500,
                message: "mock failure".to_string(),
            });
        }
        Ok(self.result.clone())
    }
}
