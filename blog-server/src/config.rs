use std::net::SocketAddr;
use std::ops::Deref;
use std::str::FromStr;
use std::time::Duration;

use envconfig::Envconfig;
use tracing::Level;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexBool(pub bool);

impl FromStr for FlexBool {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(FlexBool(true)),
            "false" | "0" | "no" | "off" | "" => Ok(FlexBool(false)),
            _ => Err(format!("Invalid boolean value: {}", s)),
        }
    }
}

impl From<FlexBool> for bool {
    fn from(flex: FlexBool) -> Self {
        flex.0
    }
}

impl Deref for FlexBool {
    type Target = bool;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Envconfig, Clone, Debug)]
pub struct Config {
    #[envconfig(default = "127.0.0.1:3000")]
    pub address: SocketAddr,

    #[envconfig(from = "DEBUG", default = "false")]
    pub debug: FlexBool,

    #[envconfig(from = "ENABLE_METRICS", default = "false")]
    pub enable_metrics: FlexBool,

    // Flag resolution is disabled entirely when no key is configured
    #[envconfig(from = "LAUNCHDARKLY_API_KEY")]
    pub launchdarkly_api_key: Option<String>,

    #[envconfig(from = "LAUNCHDARKLY_BASE_URL", default = "https://sdk.launchdarkly.com")]
    pub launchdarkly_base_url: String,

    #[envconfig(from = "FLAG_INIT_TIMEOUT_SECS", default = "10")]
    pub flag_init_timeout_secs: u64,

    #[envconfig(from = "FLAG_POLL_INTERVAL_SECS", default = "30")]
    pub flag_poll_interval_secs: u64,

    #[envconfig(from = "FLAG_REQUEST_TIMEOUT_SECS", default = "30")]
    pub flag_request_timeout_secs: u64,

    #[envconfig(from = "SANITY_PROJECT_ID", default = "")]
    pub sanity_project_id: String,

    #[envconfig(from = "SANITY_DATASET", default = "production")]
    pub sanity_dataset: String,

    #[envconfig(from = "SANITY_API_VERSION", default = "2024-10-28")]
    pub sanity_api_version: String,

    #[envconfig(from = "SANITY_API_URL", default = "")]
    pub sanity_api_url: String,

    #[envconfig(from = "SANITY_USE_CDN", default = "true")]
    pub sanity_use_cdn: FlexBool,

    #[envconfig(from = "SANITY_TOKEN")]
    pub sanity_token: Option<String>,

    #[envconfig(from = "CMS_REQUEST_TIMEOUT_SECS", default = "10")]
    pub cms_request_timeout_secs: u64,

    #[envconfig(from = "SITE_NAME", default = "Blog")]
    pub site_name: String,

    #[envconfig(from = "SITE_DESCRIPTION", default = "")]
    pub site_description: String,

    #[envconfig(from = "OTEL_URL")]
    pub otel_url: Option<String>,

    #[envconfig(from = "OTEL_SAMPLING_RATE", default = "1.0")]
    pub otel_sampling_rate: f64,

    #[envconfig(from = "OTEL_SERVICE_NAME", default = "blog-server")]
    pub otel_service_name: String,

    #[envconfig(from = "OTEL_EXPORT_TIMEOUT_SECS", default = "3")]
    pub otel_export_timeout_secs: u64,

    #[envconfig(from = "OTEL_LOG_LEVEL", default = "info")]
    pub otel_log_level: Level,
}

impl Config {
    pub fn default_test_config() -> Self {
        Self {
            address: SocketAddr::from_str("127.0.0.1:0").unwrap(),
            debug: FlexBool(false),
            enable_metrics: FlexBool(false),
            launchdarkly_api_key: None,
            launchdarkly_base_url: "http://localhost:8030".to_string(),
            flag_init_timeout_secs: 1,
            flag_poll_interval_secs: 0,
            flag_request_timeout_secs: 5,
            sanity_project_id: "test-project".to_string(),
            sanity_dataset: "production".to_string(),
            sanity_api_version: "2024-10-28".to_string(),
            sanity_api_url: "http://localhost:8031".to_string(),
            sanity_use_cdn: FlexBool(false),
            sanity_token: None,
            cms_request_timeout_secs: 5,
            site_name: "Blog".to_string(),
            site_description: "".to_string(),
            otel_url: None,
            otel_sampling_rate: 1.0,
            otel_service_name: "blog-server".to_string(),
            otel_export_timeout_secs: 3,
            otel_log_level: Level::INFO,
        }
    }

    /// The configured flag-service key, treating an empty value as unset.
    pub fn flag_sdk_key(&self) -> Option<&str> {
        self.launchdarkly_api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn flag_init_timeout(&self) -> Duration {
        Duration::from_secs(self.flag_init_timeout_secs)
    }

    pub fn flag_poll_interval(&self) -> Option<Duration> {
        match self.flag_poll_interval_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }

    /// Base URL of the CMS query API. Falls back to the project's hosted API,
    /// using the CDN edge when enabled.
    pub fn get_sanity_api_url(&self) -> String {
        if !self.sanity_api_url.is_empty() {
            return self.sanity_api_url.trim_end_matches('/').to_string();
        }
        let host = if *self.sanity_use_cdn {
            "apicdn.sanity.io"
        } else {
            "api.sanity.io"
        };
        format!("https://{}.{}", self.sanity_project_id, host)
    }
}
