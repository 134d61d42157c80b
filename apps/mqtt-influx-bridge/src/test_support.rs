use crate::error::StorageError;
use crate::sink::StorageBackend;
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

/// In-memory `StorageBackend` that records every call.
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<Mutex<FakeState>>,
}

#[derive(Default)]
struct FakeState {
    databases: Vec<String>,
    list_calls: usize,
    created: Vec<String>,
    lines: Vec<(String, String)>,
    failing_writes: usize,
    unreachable: bool,
}

impl FakeBackend {
    pub fn with_databases(names: &[&str]) -> Self {
        let backend = Self::default();
        backend.state.lock().unwrap().databases = names.iter().map(|n| n.to_string()).collect();
        backend
    }

    /// Makes the next `count` writes fail with a connection failure.
    pub fn fail_next_writes(&self, count: usize) {
        self.state.lock().unwrap().failing_writes = count;
    }

    pub fn set_unreachable(&self, unreachable: bool) {
        self.state.lock().unwrap().unreachable = unreachable;
    }

    pub fn list_calls(&self) -> usize {
        self.state.lock().unwrap().list_calls
    }

    pub fn created(&self) -> Vec<String> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn lines(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().lines.clone()
    }
}

#[async_trait]
impl StorageBackend for FakeBackend {
    async fn list_databases(&self) -> Result<Vec<String>, StorageError> {
        let mut state = self.state.lock().unwrap();
        state.list_calls += 1;
        if state.unreachable {
            return Err(StorageError::ConnectionFailure("connection refused".into()));
        }
        Ok(state.databases.clone())
    }

    async fn create_database(&self, name: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(StorageError::ConnectionFailure("connection refused".into()));
        }
        state.created.push(name.to_string());
        if !state.databases.iter().any(|existing| existing == name) {
            state.databases.push(name.to_string());
        }
        Ok(())
    }

    async fn write_line(&self, database: &str, line: &str) -> Result<(), StorageError> {
        let mut state = self.state.lock().unwrap();
        if state.unreachable {
            return Err(StorageError::ConnectionFailure("connection refused".into()));
        }
        if state.failing_writes > 0 {
            state.failing_writes -= 1;
            return Err(StorageError::ConnectionFailure("connection reset".into()));
        }
        state.lines.push((database.to_string(), line.to_string()));
        Ok(())
    }
}
