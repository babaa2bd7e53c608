//! Error types for ingestion and session persistence

use thiserror::Error;
use uuid::Uuid;

use crate::schema::CanonicalField;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Fatal ingestion failures. Each one aborts the pipeline and discards
/// all partial state; the message is shown to the user as-is.
///
/// Unparseable numeric cells are NOT errors, see `row::CellValue`.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Header only, or nothing at all
    #[error("CSV file must contain headers and at least one row of data")]
    EmptyDataset,

    /// One or more canonical fields have no matching header column
    #[error("Missing required headers: {}", field_list(.missing))]
    SchemaMismatch { missing: Vec<CanonicalField> },

    /// Data row column count differs from the header (row is 1-based, header = 1)
    #[error("Row {row}: expected {expected} columns, found {found}")]
    RowShape {
        row: u64,
        expected: usize,
        found: usize,
    },

    #[error("CSV read error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid building data: {0}")]
    InvalidBuilding(String),
}

fn field_list(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.key())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Session storage failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Configuration error: {0}")]
    Config(String),
}
