use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use crate::cms::{CmsError, ContentSource, QueryParams};
use crate::config::Config;
use crate::metrics_consts::{CMS_FETCH_COUNTER, CMS_FETCH_DURATION};

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    result: Value,
}

#[derive(Deserialize)]
struct QueryErrorResponse {
    error: Option<QueryErrorBody>,
    message: Option<String>,
}

#[derive(Deserialize)]
struct QueryErrorBody {
    description: Option<String>,
}

/// Client for the Sanity HTTP query API.
pub struct SanityClient {
    client: reqwest::Client,
    query_url: Url,
    token: Option<String>,
}

impl SanityClient {
    pub fn new(
        api_url: &str,
        api_version: &str,
        dataset: &str,
        token: Option<String>,
        timeout: Duration,
    ) -> Result<SanityClient, CmsError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CmsError::ClientBuildError(e.to_string()))?;

        let version = api_version.trim_start_matches('v');
        let query_url = Url::parse(&format!(
            "{}/v{}/data/query/{}",
            api_url.trim_end_matches('/'),
            version,
            dataset
        ))?;

        Ok(SanityClient {
            client,
            query_url,
            token: token.filter(|t| !t.is_empty()),
        })
    }

    pub fn from_config(config: &Config) -> Result<SanityClient, CmsError> {
        SanityClient::new(
            &config.get_sanity_api_url(),
            &config.sanity_api_version,
            &config.sanity_dataset,
            config.sanity_token.clone(),
            Duration::from_secs(config.cms_request_timeout_secs),
        )
    }

    /// Builds the GET url for a query. Parameters travel as `$name=<json>`.
    pub fn query_url(&self, query: &str, params: &QueryParams) -> Url {
        let mut url = self.query_url.clone();
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("query", query);
            for (name, value) in params {
                pairs.append_pair(&format!("${}", name), &value.to_string());
            }
        }
        url
    }
}

#[async_trait]
impl ContentSource for SanityClient {
    #[instrument(skip_all)]
    async fn fetch(&self, query: &str, params: &QueryParams) -> Result<Option<Value>, CmsError> {
        let started = Instant::now();
        let mut request = self.client.get(self.query_url(query, params));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                metrics::counter!(CMS_FETCH_COUNTER, "outcome" => "unreachable").increment(1);
                return Err(e.into());
            }
        };
        metrics::histogram!(CMS_FETCH_DURATION).record(started.elapsed().as_secs_f64());

        let status = response.status();
        if !status.is_success() {
            metrics::counter!(CMS_FETCH_COUNTER, "outcome" => "error").increment(1);
            let message = match response.json::<QueryErrorResponse>().await {
                Ok(QueryErrorResponse {
                    error: Some(QueryErrorBody {
                        description: Some(description),
                    }),
                    ..
                }) => description,
                Ok(QueryErrorResponse {
                    message: Some(message),
                    ..
                }) => message,
                _ => status.to_string(),
            };
            tracing::error!(status = status.as_u16(), "cms query failed: {}", message);
            return Err(CmsError::QueryError {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.json::<QueryResponse>().await?;
        metrics::counter!(CMS_FETCH_COUNTER, "outcome" => "ok").increment(1);
        match body.result {
            Value::Null => Ok(None),
            result => Ok(Some(result)),
        }
    }
}
