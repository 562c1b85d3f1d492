//! Concurrent citation enrichment.

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;

use super::{CitationCache, CitationLookup};
use crate::models::{ApiSource, Paper};

/// Default number of concurrent lookups
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Tally of one enrichment pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnrichSummary {
    /// Counts served from the cache
    pub cached: usize,
    /// Counts fetched from the lookup
    pub fetched: usize,
    /// Papers whose lookup failed (count set to zero)
    pub failed: usize,
}

/// Attaches citation counts to papers with a bounded number of concurrent
/// lookups, consulting the cache first
#[derive(Debug)]
pub struct CitationEnricher<'c> {
    lookup: Arc<dyn CitationLookup>,
    cache: &'c CitationCache,
    pool_size: usize,
}

enum Resolved {
    Cached(u32),
    Fetched(u32),
}

impl<'c> CitationEnricher<'c> {
    pub fn new(lookup: Arc<dyn CitationLookup>, cache: &'c CitationCache) -> Self {
        Self {
            lookup,
            cache,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Set `citation_count` on every paper produced by `api_source`
    ///
    /// Crossref records already carry their count and are left untouched.
    /// A failed lookup sets the count to zero; it never aborts the batch.
    pub async fn enrich(&self, papers: &mut [Paper], api_source: ApiSource) -> EnrichSummary {
        let mut summary = EnrichSummary::default();
        if api_source == ApiSource::Crossref {
            return summary;
        }

        let jobs: Vec<(usize, Option<String>)> = papers
            .iter()
            .enumerate()
            .map(|(i, paper)| (i, source_identifier(paper, api_source)))
            .collect();

        let mut results = stream::iter(jobs)
            .map(|(i, source_id)| async move { (i, self.resolve(source_id, api_source).await) })
            .buffer_unordered(self.pool_size);

        while let Some((i, resolved)) = results.next().await {
            let Some(paper) = papers.get_mut(i) else {
                continue;
            };
            match resolved {
                Ok(Resolved::Cached(count)) => {
                    summary.cached += 1;
                    paper.citation_count = count;
                }
                Ok(Resolved::Fetched(count)) => {
                    summary.fetched += 1;
                    paper.citation_count = count;
                }
                Err(reason) => {
                    tracing::warn!(
                        "Citation lookup failed for '{}': {}",
                        paper.title,
                        reason
                    );
                    summary.failed += 1;
                    paper.citation_count = 0;
                }
            }
        }

        tracing::debug!(
            "Citation enrichment for {}: {} cached, {} fetched, {} failed",
            api_source,
            summary.cached,
            summary.fetched,
            summary.failed
        );
        summary
    }

    async fn resolve(
        &self,
        source_id: Option<String>,
        api_source: ApiSource,
    ) -> Result<Resolved, String> {
        let Some(source_id) = source_id else {
            return Err(format!("record has no {} identifier", api_source));
        };

        if let Some(count) = self.cache.get(&source_id, api_source) {
            return Ok(Resolved::Cached(count));
        }

        match self.lookup.cited_by_count(&source_id, api_source).await {
            Ok(count) => {
                self.cache.insert(&source_id, api_source, count);
                Ok(Resolved::Fetched(count))
            }
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Identifier the lookup understands for a record from `api_source`
fn source_identifier(paper: &Paper, api_source: ApiSource) -> Option<String> {
    let id = match api_source {
        ApiSource::PubMed => paper.pmid.as_deref(),
        ApiSource::Pmc => paper.pmcid.as_deref(),
        ApiSource::Crossref => paper.doi.as_deref(),
    };
    id.map(str::trim).filter(|s| !s.is_empty()).map(String::from)
}
