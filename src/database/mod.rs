pub mod collection;
pub mod manager;
pub mod memory;
pub mod postgres;
pub mod record;
pub mod store;

use thiserror::Error;

use crate::filter::error::FilterError;

pub use collection::Collection;
pub use manager::DatabaseManager;
pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;
pub use record::{Document, Record, RecordError};
pub use store::{DocumentStore, Write};

/// Errors from the document store backends
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error("Invalid database URL")]
    InvalidDatabaseUrl,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Query error: {0}")]
    QueryError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    #[error("Corrupt document: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}
