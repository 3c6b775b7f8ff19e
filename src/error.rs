//! Error types for the record store, the blob store and the certificate flows.

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors raised by a [`crate::db::RecordStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("certificate not found: {0}")]
    NotFound(uuid::Uuid),

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("invalid row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: ValidationError,
    },
}

/// Errors raised by a [`crate::storage::BlobStore`].
#[derive(Debug, Error)]
pub enum BlobError {
    #[error("object already exists: {0}")]
    AlreadyExists(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid object path: {0}")]
    InvalidPath(String),

    #[error("storage io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failure of a user-facing certificate action.
#[derive(Debug, Error)]
pub enum CertificateError {
    #[error("{0}")]
    Validation(#[from] ValidationError),

    #[error("upload failed: {0}")]
    Upload(#[source] BlobError),

    #[error("saving to the database failed: {0}")]
    Persistence(#[source] StoreError),
}
