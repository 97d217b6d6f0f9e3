use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;

use crate::cms::sanity::SanityClient;
use crate::config::Config;
use crate::flags::flag_source::{FlagSource, HttpFlagSource};
use crate::flags::FlagResolver;
use crate::pages::SiteSettings;
use crate::router;

pub async fn serve<F>(config: Config, listener: TcpListener, shutdown: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    let cms = match SanityClient::from_config(&config) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!(
                "Failed to create CMS client for {}: {}",
                config.get_sanity_api_url(),
                e
            );
            return;
        }
    };

    let flag_source: Option<Arc<dyn FlagSource + Send + Sync>> = match config.flag_sdk_key() {
        Some(sdk_key) => match HttpFlagSource::new(
            &config.launchdarkly_base_url,
            sdk_key.to_string(),
            Duration::from_secs(config.flag_request_timeout_secs),
        ) {
            Ok(source) => Some(Arc::new(source)),
            Err(e) => {
                tracing::error!("Failed to create flag service client: {}", e);
                return;
            }
        },
        None => {
            tracing::warn!("LAUNCHDARKLY_API_KEY is not set, every flag serves its default");
            None
        }
    };

    let flags = Arc::new(FlagResolver::new(
        flag_source,
        config.flag_init_timeout(),
        config.flag_poll_interval(),
    ));

    let app = router::router(
        cms,
        flags,
        SiteSettings::from_config(&config),
        *config.enable_metrics,
    );

    match listener.local_addr() {
        Ok(addr) => tracing::info!("listening on {:?}", addr),
        Err(e) => tracing::warn!("listening on an unknown address: {}", e),
    }
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
    {
        tracing::error!("server error: {}", e);
    }
}
