//! Row sources and configuration for the trellis engine

pub mod config;
pub mod sources;
pub mod table;

use std::sync::Arc;

use arrow::datatypes::Schema;
use arrow::error::ArrowError;
use arrow::record_batch::RecordBatch;
use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinError;
use trellis_core::TrellisError;

// Re-exports
pub use config::{NullConfig, TrellisConfig};
pub use sources::{CsvSource, SalesDemoSource};
pub use table::{rows_from_batch, TableRow};

/// Errors that can occur in data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Arrow error: {0}")]
    Arrow(ArrowError),

    #[error("CSV parsing error: {0}")]
    Csv(String),

    #[error("Config error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Schema detection error: {0}")]
    SchemaDetection(String),

    #[error("Join error: {0}")]
    Join(#[from] JoinError),

    #[error(transparent)]
    Trellis(#[from] TrellisError),
}

impl From<csv::Error> for DataError {
    fn from(error: csv::Error) -> Self {
        match error.kind() {
            csv::ErrorKind::Io(io_err) => DataError::Io(std::io::Error::new(io_err.kind(), error.to_string())),
            _ => DataError::Csv(error.to_string()),
        }
    }
}

impl From<ArrowError> for DataError {
    fn from(error: ArrowError) -> Self {
        DataError::Arrow(error)
    }
}

/// A source of rows for a trellis
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Get the schema of this data source
    async fn schema(&self) -> Arc<Schema>;

    /// Query all data
    async fn query_all(&self) -> Result<RecordBatch, DataError>;

    /// Get total row count
    async fn row_count(&self) -> Result<usize, DataError>;

    /// Get the source name/path
    fn source_name(&self) -> &str;

    /// Load every row as a record view
    async fn load_rows(&self) -> Result<Vec<TableRow>, DataError> {
        let batch = self.query_all().await?;
        tracing::info!("Loaded {} rows from {}", batch.num_rows(), self.source_name());
        Ok(rows_from_batch(Arc::new(batch)))
    }
}
