//! Executor contract
//!
//! Execution lives outside this workspace. An executor receives only a
//! [`ValidatedStatement`]; it never sees request text or model output.

use querygate_sql::ValidatedStatement;
use serde::Serialize;
use std::time::Duration;

/// Rows returned by an executor
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ResultSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<serde_json::Value>>,
}

impl ResultSet {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn with_row(mut self, row: Vec<serde_json::Value>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Errors an executor may report; passed through untouched
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Query failed: {0}")]
    Query(String),

    #[error("Execution timed out after {} ms", .0.as_millis())]
    Timeout(Duration),

    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Runs validated statements against the data store
#[async_trait::async_trait]
pub trait QueryExecutor: Send + Sync {
    async fn execute(&self, statement: &ValidatedStatement) -> Result<ResultSet, ExecutionError>;
}
