mod bridge;
mod config;
mod decoder;
mod error;
mod flatten;
mod mqtt;
mod sink;

#[cfg(test)]
mod test_support;

use crate::bridge::Bridge;
use crate::config::Config;
use crate::decoder::MessageDecoder;
use crate::sink::{InfluxHttp, StorageSink};
use anyhow::{Context, Result};

fn init_tracing(config: &Config) -> Result<()> {
    use opentelemetry::KeyValue;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::{runtime::Tokio, trace::Config as OTelTraceConfig, Resource};
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,mqtt_influx_bridge=info".into());
    let fmt_layer = tracing_subscriber::fmt::layer().with_target(true);

    if let Some(endpoint) = &config.otlp_endpoint {
        let endpoint = normalize_otlp_http_endpoint(endpoint);
        let exporter = opentelemetry_otlp::new_exporter()
            .http()
            .with_endpoint(endpoint);
        let tracer = opentelemetry_otlp::new_pipeline()
            .tracing()
            .with_exporter(exporter)
            .with_trace_config(OTelTraceConfig::default().with_resource(Resource::new(vec![
                KeyValue::new("service.name", "mqtt-influx-bridge"),
            ])))
            .install_batch(Tokio)?;

        let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .with(otel_layer)
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()?;
    }

    Ok(())
}

fn normalize_otlp_http_endpoint(endpoint: &str) -> String {
    let trimmed = endpoint.trim();
    if trimmed.contains("/v1/traces") {
        return trimmed.to_string();
    }
    format!("{}/v1/traces", trimmed.trim_end_matches('/'))
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config)?;
    tracing::info!(
        broker = %format!("{}:{}", config.mqtt_host, config.mqtt_port),
        influx = %config.influx_url,
        database = %config.influx_database,
        "MQTT to InfluxDB bridge starting"
    );

    let backend = InfluxHttp::from_config(&config).context("failed to build InfluxDB client")?;
    let mut sink = StorageSink::new(backend);
    sink.ensure_database(&config.influx_database)
        .await
        .context("InfluxDB database setup failed")?;
    tracing::info!(database = ?sink.database(), "InfluxDB target database ready");

    let bridge = Bridge::new(MessageDecoder::from_config(&config), sink);

    tokio::select! {
        _ = mqtt::run_listener(&config, &bridge) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutdown signal received");
        }
    }
    bridge.stats().log_summary();

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::normalize_otlp_http_endpoint;

    #[test]
    fn otlp_endpoint_gets_traces_path() {
        assert_eq!(
            normalize_otlp_http_endpoint("http://collector:4318/"),
            "http://collector:4318/v1/traces"
        );
        assert_eq!(
            normalize_otlp_http_endpoint("http://collector:4318/v1/traces"),
            "http://collector:4318/v1/traces"
        );
    }
}
