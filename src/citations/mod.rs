//! Citation enrichment.
//!
//! Crossref records arrive with their citation count. PubMed and PMC records
//! need a secondary "cited-by" lookup, which [`CitationEnricher`] runs
//! concurrently over a batch, consulting a [`CitationCache`] first so a
//! record is looked up at most once per TTL window.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use paper_harvest::citations::{CitationCache, CitationEnricher, EutilsCitationLookup};
//! use paper_harvest::models::{ApiSource, Paper};
//!
//! # async fn example(mut papers: Vec<Paper>) -> Result<(), Box<dyn std::error::Error>> {
//! let cache = CitationCache::default();
//! let lookup = Arc::new(EutilsCitationLookup::new()?);
//! let enricher = CitationEnricher::new(lookup, &cache);
//! enricher.enrich(&mut papers, ApiSource::PubMed).await;
//! # Ok(())
//! # }
//! ```

mod cache;
mod enricher;
mod lookup;

pub use cache::{CitationCache, Clock, ManualClock, SystemClock, DEFAULT_TTL_HOURS};
pub use enricher::{CitationEnricher, EnrichSummary, DEFAULT_POOL_SIZE};
pub use lookup::{CitationLookup, EutilsCitationLookup};
