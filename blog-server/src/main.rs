use std::time::Duration;

use envconfig::Envconfig;
use opentelemetry::KeyValue;
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::trace::{Sampler, Tracer};
use opentelemetry_sdk::{runtime, Resource};
use tokio::signal;
use tracing::level_filters::LevelFilter;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use blog_server::config::Config;
use blog_server::server::serve;

async fn shutdown() {
    let mut term = signal::unix::signal(signal::unix::SignalKind::terminate())
        .expect("failed to register SIGTERM handler");
    let mut interrupt = signal::unix::signal(signal::unix::SignalKind::interrupt())
        .expect("failed to register SIGINT handler");

    tokio::select! {
        _ = term.recv() => {},
        _ = interrupt.recv() => {},
    };

    tracing::info!("Shutting down gracefully...");
}

/// OTLP exporter for request spans, sampled at `otel_sampling_rate`.
fn otel_tracer(otel_url: &str, config: &Config) -> Tracer {
    opentelemetry_otlp::new_pipeline()
        .tracing()
        .with_trace_config(
            opentelemetry_sdk::trace::Config::default()
                .with_sampler(Sampler::TraceIdRatioBased(config.otel_sampling_rate))
                .with_resource(Resource::new(vec![KeyValue::new(
                    "service.name",
                    config.otel_service_name.clone(),
                )])),
        )
        .with_exporter(
            opentelemetry_otlp::new_exporter()
                .tonic()
                .with_endpoint(otel_url)
                .with_timeout(Duration::from_secs(config.otel_export_timeout_secs)),
        )
        .install_batch(runtime::Tokio)
        .expect("Failed to initialize OpenTelemetry tracer")
}

/// Pretty logs under `DEBUG`, JSON otherwise. Spans go to OTLP when a
/// collector is configured.
fn init_tracing(config: &Config) {
    let log_layer = if *config.debug {
        fmt::layer()
            .pretty()
            .with_filter(EnvFilter::from_default_env())
            .boxed()
    } else {
        fmt::layer()
            .json()
            .with_filter(EnvFilter::from_default_env())
            .boxed()
    };

    let otel_layer = config.otel_url.as_deref().map(|otel_url| {
        OpenTelemetryLayer::new(otel_tracer(otel_url, config))
            .with_filter(LevelFilter::from_level(config.otel_log_level))
    });

    tracing_subscriber::registry()
        .with(log_layer)
        .with(otel_layer)
        .init();
}

#[tokio::main]
async fn main() {
    let config = Config::init_from_env().expect("Invalid configuration:");
    init_tracing(&config);

    let listener = tokio::net::TcpListener::bind(config.address)
        .await
        .expect("could not bind port");
    serve(config, listener, shutdown()).await;
}
