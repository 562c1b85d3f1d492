//! Local persistence for retrieved papers.
//!
//! [`PaperStore`] keeps one row per paper identifier in SQLite, together with
//! its download state, user notes and AI notes. Search keywords that led to a
//! paper are kept in a side table.

mod paper_store;

pub use paper_store::{PaperStore, StoredPaper};

use thiserror::Error;

/// Errors raised by the paper store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Paper not found: {0}")]
    NotFound(String),

    #[error("Invalid paper: {0}")]
    InvalidPaper(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;
