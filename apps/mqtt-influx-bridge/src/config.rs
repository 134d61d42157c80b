use anyhow::{Context, Result};
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_PATH_ENV: &str = "BRIDGE_CONFIG_PATH";

/// Values read from the optional JSON config file. Each one applies only when
/// the matching environment variable is unset.
#[derive(Debug, Clone, Default, Deserialize)]
struct FileOverrides {
    #[serde(default)]
    mqtt_host: Option<String>,
    #[serde(default)]
    mqtt_port: Option<u16>,
    #[serde(default)]
    mqtt_username: Option<String>,
    #[serde(default)]
    mqtt_password: Option<String>,
    #[serde(default)]
    mqtt_client_id: Option<String>,
    #[serde(default)]
    mqtt_topic: Option<String>,
    #[serde(default)]
    mqtt_keepalive_secs: Option<u64>,
    #[serde(default)]
    status_topic: Option<String>,
    #[serde(default)]
    influx_url: Option<String>,
    #[serde(default)]
    influx_host: Option<String>,
    #[serde(default)]
    influx_port: Option<u16>,
    #[serde(default)]
    influx_username: Option<String>,
    #[serde(default)]
    influx_password: Option<String>,
    #[serde(default)]
    influx_database: Option<String>,
    #[serde(default)]
    influx_timeout_ms: Option<u64>,
    #[serde(default)]
    measurement: Option<String>,
    #[serde(default)]
    key_separator: Option<String>,
}

fn load_file_overrides(path: &Path) -> Result<FileOverrides> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bridge config {}", path.display()))?;
    let mut bytes = contents.into_bytes();
    simd_json::serde::from_slice(&mut bytes)
        .with_context(|| format!("failed to parse bridge config {}", path.display()))
}

#[derive(Clone, Debug)]
pub struct Config {
    pub mqtt_host: String,
    pub mqtt_port: u16,
    pub mqtt_username: Option<String>,
    pub mqtt_password: Option<String>,
    pub mqtt_client_id: String,
    pub mqtt_topic: String,
    pub mqtt_keepalive_secs: u64,
    pub status_topic: String,
    pub influx_url: String,
    pub influx_username: Option<String>,
    pub influx_password: Option<String>,
    pub influx_database: String,
    pub influx_timeout_ms: u64,
    pub measurement: String,
    pub key_separator: String,
    pub otlp_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        let overrides = match env_optional(CONFIG_PATH_ENV) {
            Some(path) => load_file_overrides(&PathBuf::from(path))?,
            None => FileOverrides::default(),
        };
        Self::resolve(overrides)
    }

    fn resolve(file: FileOverrides) -> Result<Self> {
        let mqtt_host = string_setting("BRIDGE_MQTT_HOST", file.mqtt_host, "127.0.0.1");
        let mqtt_port = parsed_setting("BRIDGE_MQTT_PORT", file.mqtt_port, 1883)?;
        let mqtt_username = optional_setting("BRIDGE_MQTT_USERNAME", file.mqtt_username);
        let mqtt_password = optional_setting("BRIDGE_MQTT_PASSWORD", file.mqtt_password);
        let mqtt_client_id =
            string_setting("BRIDGE_MQTT_CLIENT_ID", file.mqtt_client_id, "MQTTInfluxDBBridge");
        let mqtt_topic = string_setting("BRIDGE_MQTT_TOPIC", file.mqtt_topic, "selfpv/tasmota/#");
        let mqtt_keepalive_secs =
            parsed_setting("BRIDGE_MQTT_KEEPALIVE_SECS", file.mqtt_keepalive_secs, 30)?;
        let status_topic =
            string_setting("BRIDGE_STATUS_TOPIC", file.status_topic, "selfpv/tasmota/LWT");

        let influx_host = string_setting("BRIDGE_INFLUX_HOST", file.influx_host, "127.0.0.1");
        let influx_port = parsed_setting("BRIDGE_INFLUX_PORT", file.influx_port, 8086)?;
        let influx_url = string_setting(
            "BRIDGE_INFLUX_URL",
            file.influx_url,
            &format!("http://{influx_host}:{influx_port}"),
        );
        let influx_username = match env::var("BRIDGE_INFLUX_USERNAME") {
            Ok(value) => Some(value),
            Err(_) => Some(file.influx_username.unwrap_or_else(|| "mqtt".to_string())),
        }
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty());
        let influx_password = match env::var("BRIDGE_INFLUX_PASSWORD") {
            Ok(value) => Some(value),
            Err(_) => Some(file.influx_password.unwrap_or_else(|| "mqtt".to_string())),
        };
        let influx_database =
            string_setting("BRIDGE_INFLUX_DATABASE", file.influx_database, "tasmota");
        let influx_timeout_ms =
            parsed_setting("BRIDGE_INFLUX_TIMEOUT_MS", file.influx_timeout_ms, 10_000)?;

        let measurement = string_setting("BRIDGE_MEASUREMENT", file.measurement, "selfPV");
        // The separator may legitimately be empty, so it is not trimmed or filtered.
        let key_separator = env::var("BRIDGE_KEY_SEPARATOR")
            .ok()
            .or(file.key_separator)
            .unwrap_or_else(|| "_".to_string());
        let otlp_endpoint = env_optional("OTEL_EXPORTER_OTLP_ENDPOINT");

        Ok(Self {
            mqtt_host,
            mqtt_port,
            mqtt_username,
            mqtt_password,
            mqtt_client_id,
            mqtt_topic,
            mqtt_keepalive_secs,
            status_topic,
            influx_url,
            influx_username,
            influx_password,
            influx_database,
            influx_timeout_ms,
            measurement,
            key_separator,
            otlp_endpoint,
        })
    }

    pub fn mqtt_keepalive(&self) -> Duration {
        Duration::from_secs(self.mqtt_keepalive_secs)
    }

    pub fn influx_timeout(&self) -> Duration {
        Duration::from_millis(self.influx_timeout_ms)
    }
}

fn env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn string_setting(key: &str, file: Option<String>, default: &str) -> String {
    env_optional(key)
        .or_else(|| {
            file.map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        })
        .unwrap_or_else(|| default.to_string())
}

fn optional_setting(key: &str, file: Option<String>) -> Option<String> {
    env_optional(key).or_else(|| {
        file.map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

fn parsed_setting<T>(key: &str, file: Option<T>, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env_optional(key) {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(file.unwrap_or(default)),
    }
}
