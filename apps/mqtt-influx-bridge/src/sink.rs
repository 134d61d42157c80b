mod influx;
mod line_protocol;


pub use influx::InfluxHttp;

use crate::decoder::SensorRecord;
use crate::error::{SetupError, StorageError};
use async_trait::async_trait;

/// Raw operations against the time-series store.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<String>, StorageError>;
    async fn create_database(&self, name: &str) -> Result<(), StorageError>;
    async fn write_line(&self, database: &str, line: &str) -> Result<(), StorageError>;
}

/// Writes one point per record into the selected database.
pub struct StorageSink<B> {
    backend: B,
    database: Option<String>,
}

impl<B: StorageBackend> StorageSink<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            database: None,
        }
    }

    pub fn database(&self) -> Option<&str> {
        self.database.as_deref()
    }

    /// Creates `name` if the backend does not list it yet, then makes it the
    /// target of every later write. Safe to repeat.
    pub async fn ensure_database(&mut self, name: &str) -> Result<(), SetupError> {
        let databases = self.backend.list_databases().await.map_err(SetupError::List)?;
        if databases.iter().any(|existing| existing == name) {
            tracing::debug!(database = %name, "database already present");
        } else {
            self.backend
                .create_database(name)
                .await
                .map_err(|source| SetupError::Create {
                    name: name.to_string(),
                    source,
                })?;
            tracing::info!(database = %name, "created database");
        }
        self.database = Some(name.to_string());
        Ok(())
    }

    pub async fn write(&self, record: &SensorRecord) -> Result<(), StorageError> {
        let database = self.database.as_deref().ok_or(StorageError::NoDatabase)?;
        let line = line_protocol::encode_record(record);
        tracing::debug!(database, line = %line, "writing point");
        self.backend.write_line(database, &line).await
    }
}
