use std::net::SocketAddr;
use std::sync::Arc;

use httpmock::MockServer;
use once_cell::sync::Lazy;
use reqwest::header::{COOKIE, SET_COOKIE};
use tokio::net::TcpListener;
use tokio::sync::Notify;

use blog_server::config::Config;
use blog_server::server::serve;

pub static DEFAULT_CONFIG: Lazy<Config> = Lazy::new(Config::default_test_config);

pub const SDK_KEY: &str = "sdk-test-key";

/// Test config pointing the CMS, and optionally the flag service, at mock servers.
pub fn config_for(cms: &MockServer, flags: Option<&MockServer>) -> Config {
    let mut config = DEFAULT_CONFIG.clone();
    config.sanity_api_url = cms.base_url();
    if let Some(flags) = flags {
        config.launchdarkly_api_key = Some(SDK_KEY.to_string());
        config.launchdarkly_base_url = flags.base_url();
    }
    config
}

pub struct ServerHandle {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
}

impl ServerHandle {
    pub async fn for_config(config: Config) -> ServerHandle {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let notify = Arc::new(Notify::new());
        let shutdown = notify.clone();

        tokio::spawn(async move {
            serve(config, listener, async move { notify.notified().await }).await
        });
        ServerHandle { addr, shutdown }
    }

    /// Navigates to `path` the way a browser loads a page.
    pub async fn visit(&self, path: &str, cookie: Option<&str>) -> reqwest::Response {
        self.get(path, "document", cookie).await
    }

    pub async fn get(&self, path: &str, fetch_dest: &str, cookie: Option<&str>) -> reqwest::Response {
        let client = reqwest::Client::new();
        let mut request = client
            .get(format!("http://{:?}{}", self.addr, path))
            .header("sec-fetch-dest", fetch_dest);
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        request.send().await.expect("failed to send request")
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown.notify_one()
    }
}

/// Percent-encoded identity cookie for the given visitor.
pub fn identity_cookie(user_id: &str) -> String {
    format!("ab-test=%7B%22userId%22%3A%22{}%22%7D", user_id)
}

pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .map(|value| value.to_str().unwrap().to_string())
        .collect()
}
