use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),
    #[error("unsupported value shape at `{path}`: {reason}")]
    UnsupportedShape { path: String, reason: &'static str },
    #[error("payload produced no fields")]
    NoFields,
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend unreachable: {0}")]
    ConnectionFailure(String),
    #[error("storage backend rejected request ({status}): {message}")]
    WriteRejected { status: u16, message: String },
    #[error("no target database selected")]
    NoDatabase,
}

impl From<reqwest::Error> for StorageError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => StorageError::WriteRejected {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => StorageError::ConnectionFailure(err.to_string()),
        }
    }
}

/// Startup failure while confirming the target database; always fatal.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to list databases: {0}")]
    List(#[source] StorageError),
    #[error("failed to create database `{name}`: {source}")]
    Create {
        name: String,
        #[source]
        source: StorageError,
    },
}
