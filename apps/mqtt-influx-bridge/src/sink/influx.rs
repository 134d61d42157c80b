use super::StorageBackend;
use crate::config::Config;
use crate::error::StorageError;
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Deserialize;
use std::time::Duration;

/// InfluxDB 1.x HTTP API client (`/query` and `/write`).
#[derive(Clone)]
pub struct InfluxHttp {
    client: Client,
    base_url: String,
    credentials: Option<(String, String)>,
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    results: Vec<StatementResult>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatementResult {
    #[serde(default)]
    series: Vec<Series>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Series {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

impl InfluxHttp {
    pub fn new(
        base_url: impl Into<String>,
        credentials: Option<(String, String)>,
        timeout: Duration,
    ) -> Result<Self, StorageError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, StorageError> {
        let credentials = config
            .influx_username
            .clone()
            .map(|username| (username, config.influx_password.clone().unwrap_or_default()));
        Self::new(
            config.influx_url.clone(),
            credentials,
            config.influx_timeout(),
        )
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request = self
            .client
            .request(method, format!("{}/{}", self.base_url, path));
        match &self.credentials {
            Some((username, password)) => request.basic_auth(username, Some(password)),
            None => request,
        }
    }

    async fn query(&self, method: Method, statement: &str) -> Result<QueryResponse, StorageError> {
        let response = self
            .request(method, "query")
            .query(&[("q", statement)])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        let status = response.status().as_u16();
        let parsed: QueryResponse = response.json().await.map_err(|err| {
            StorageError::ConnectionFailure(format!("unreadable query response: {err}"))
        })?;

        let statement_error = parsed
            .error
            .clone()
            .or_else(|| parsed.results.iter().find_map(|result| result.error.clone()));
        if let Some(message) = statement_error {
            return Err(StorageError::WriteRejected { status, message });
        }
        Ok(parsed)
    }
}

#[async_trait]
impl StorageBackend for InfluxHttp {
    async fn list_databases(&self) -> Result<Vec<String>, StorageError> {
        let response = self.query(Method::GET, "SHOW DATABASES").await?;
        let names = response
            .results
            .iter()
            .flat_map(|result| result.series.iter())
            .flat_map(|series| series.values.iter())
            .filter_map(|row| row.first().and_then(|name| name.as_str()))
            .map(|name| name.to_string())
            .collect();
        Ok(names)
    }

    async fn create_database(&self, name: &str) -> Result<(), StorageError> {
        let statement = format!("CREATE DATABASE {}", quote_identifier(name));
        self.query(Method::POST, &statement).await?;
        Ok(())
    }

    async fn write_line(&self, database: &str, line: &str) -> Result<(), StorageError> {
        let response = self
            .request(Method::POST, "write")
            .query(&[("db", database)])
            .body(line.to_string())
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(rejection(response).await);
        }
        Ok(())
    }
}

async fn rejection(response: Response) -> StorageError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorBody>(&body)
        .map(|parsed| parsed.error)
        .unwrap_or(body);
    StorageError::WriteRejected { status, message }
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('\\', "\\\\").replace('"', "\\\""))
}
