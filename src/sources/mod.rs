//! Source adapters with a trait-based architecture.
//!
//! This module defines the [`Source`] trait that every upstream API adapter
//! implements. Each adapter turns a [`SearchQuery`] into that API's request
//! format and normalizes the heterogeneous response into [`Paper`] records.
//!
//! # Failure policy
//!
//! Upstream failures never escape an adapter: a non-2xx search response, a
//! network error or a malformed payload is logged and yields an empty result,
//! and a failing per-record detail fetch is skipped without aborting the batch.
//! The only error returned from [`Source::search`] is
//! [`SourceError::InvalidRequest`] for queries violating the input contract.
//!
//! # Adapters
//!
//! - [`CrossrefSource`]: Crossref Works API, single JSON call
//! - [`PubMedSource`]: NCBI E-utilities, esearch (JSON) + per-record efetch (XML);
//!   also serves the "recent" mode (past week / past month, sorted by date)
//! - [`PmcSource`]: same two-phase shape against the PMC open-access index

mod crossref;
pub mod eutils;
pub mod mock;
mod pmc;
mod pubmed;
mod registry;

pub use crossref::{CrossrefSource, CROSSREF_API_BASE};
pub use mock::MockSource;
pub use pmc::PmcSource;
pub use pubmed::PubMedSource;
pub use registry::{SourceCapabilities, SourceRegistry};

use crate::models::{ApiSource, Paper, SearchQuery};
use async_trait::async_trait;

/// The Source trait defines the interface for all upstream API adapters.
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "crossref", "pubmed")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// The value stamped on every record this adapter produces
    fn api_source(&self) -> ApiSource;

    /// Describe the capabilities of this source
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
    }

    /// Search for papers matching the query
    ///
    /// Returns at most `query.max_results` records. Upstream failures degrade
    /// to an empty or partial result.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError>;

    /// Re-fetch a single record by its source identifier
    ///
    /// `None` when the source has no detail endpoint or the fetch failed.
    async fn fetch_details(&self, _source_id: &str) -> Option<Paper> {
        None
    }
}

/// Reject queries that violate the adapter input contract
pub(crate) fn check_query(query: &SearchQuery) -> Result<(), SourceError> {
    query.validate().map_err(SourceError::InvalidRequest)
}

/// Log an upstream failure and degrade it to an empty result
pub(crate) fn degrade(source: &str, query: &SearchQuery, err: SourceError) -> Vec<Paper> {
    tracing::warn!(
        "{} search for '{}' failed, returning no results: {}",
        source,
        query.keywords,
        err
    );
    Vec::new()
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, HTML, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Non-success status from the source
    #[error("API error: {0}")]
    Api(String),

    /// Source or record not found
    #[error("Not found: {0}")]
    NotFound(String),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}

impl From<quick_xml::Error> for SourceError {
    fn from(err: quick_xml::Error) -> Self {
        SourceError::Parse(format!("XML: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_capabilities() {
        let caps = SourceCapabilities::SEARCH | SourceCapabilities::DOWNLOAD;

        assert!(caps.contains(SourceCapabilities::SEARCH));
        assert!(caps.contains(SourceCapabilities::DOWNLOAD));
        assert!(!caps.contains(SourceCapabilities::CITATIONS));
    }

    #[test]
    fn test_check_query_maps_to_invalid_request() {
        let err = check_query(&SearchQuery::new("")).unwrap_err();
        assert!(matches!(err, SourceError::InvalidRequest(_)));
    }
}
