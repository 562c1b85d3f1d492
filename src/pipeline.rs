//! End-to-end retrieval: search, enrich, store, acquire, analyze.

use std::path::PathBuf;
use std::sync::{Arc, OnceLock};

use thiserror::Error;

use crate::acquisition::Acquirer;
use crate::ai::{self, Summarizer};
use crate::citations::{
    CitationCache, CitationEnricher, CitationLookup, EutilsCitationLookup, SystemClock,
    DEFAULT_TTL_HOURS,
};
use crate::config::Config;
use crate::models::{ApiSource, Outcome, Paper, SearchQuery};
use crate::sources::{SourceError, SourceRegistry};
use crate::store::{PaperStore, StoreError};
use crate::utils::{deduplicate_papers, HttpClient};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Paper not found: {0}")]
    NotFound(String),
}

/// Options for [`Pipeline::search`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchOptions {
    /// Collapse near-duplicate records before enrichment
    pub dedup: bool,
    /// Persist the results, tagged with the query keywords
    pub save: bool,
}

/// Wires the adapters, citation enricher, acquirer and store together
#[derive(Debug)]
pub struct Pipeline {
    registry: Arc<SourceRegistry>,
    lookup: Arc<dyn CitationLookup>,
    cache: CitationCache,
    pool_size: usize,
    acquirer: Acquirer,
    store: OnceLock<PaperStore>,
    database: PathBuf,
}

impl Pipeline {
    pub fn new(
        registry: Arc<SourceRegistry>,
        lookup: Arc<dyn CitationLookup>,
        cache: CitationCache,
        acquirer: Acquirer,
        store: PaperStore,
    ) -> Self {
        Self {
            registry,
            lookup,
            cache,
            pool_size: crate::citations::DEFAULT_POOL_SIZE,
            acquirer,
            store: OnceLock::from(store),
            database: PathBuf::new(),
        }
    }

    pub fn with_pool_size(mut self, pool_size: usize) -> Self {
        self.pool_size = pool_size.max(1);
        self
    }

    /// Build every component from configuration
    ///
    /// The database is opened on first use, so a search that is not saved
    /// never touches it.
    pub fn from_config(config: &Config) -> Result<Self, PipelineError> {
        let client = HttpClient::from_settings(&config.http.api_settings())
            .map_err(SourceError::from)?;
        let client = Arc::new(client);
        let registry = Arc::new(SourceRegistry::from_endpoints(
            Arc::clone(&client),
            &config.endpoints,
        ));
        let lookup = Arc::new(EutilsCitationLookup::with_base_url(
            client,
            &config.endpoints.eutils,
        ));
        let ttl = chrono::Duration::from_std(config.citations.ttl())
            .unwrap_or_else(|_| chrono::Duration::hours(DEFAULT_TTL_HOURS));
        let cache = CitationCache::with_ttl(Arc::new(SystemClock), ttl);
        let acquirer = Acquirer::from_config(config, Arc::clone(&registry))?;

        Ok(Self {
            registry,
            lookup,
            cache,
            pool_size: config.citations.pool_size.max(1),
            acquirer,
            store: OnceLock::new(),
            database: config.database.path.clone(),
        })
    }

    /// The paper library, opened on first call
    pub fn store(&self) -> Result<&PaperStore, PipelineError> {
        if let Some(store) = self.store.get() {
            return Ok(store);
        }
        let opened = PaperStore::open(&self.database)?;
        tracing::debug!("Opened paper library at {}", self.database.display());
        Ok(self.store.get_or_init(|| opened))
    }

    pub fn acquirer(&self) -> &Acquirer {
        &self.acquirer
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    /// Search one API, then enrich citation counts and optionally persist
    ///
    /// Upstream failures have already been degraded to empty results by the
    /// adapters; only an invalid query or an unregistered source is an error.
    pub async fn search(
        &self,
        source: ApiSource,
        query: &SearchQuery,
        options: SearchOptions,
    ) -> Result<Vec<Paper>, PipelineError> {
        let adapter = self.registry.get_required(source)?;
        let mut papers = adapter.search(query).await?;
        tracing::info!(
            "{} returned {} papers for '{}'",
            adapter.name(),
            papers.len(),
            query.keywords
        );

        if options.dedup {
            let before = papers.len();
            papers = deduplicate_papers(papers);
            if papers.len() < before {
                tracing::info!("Removed {} duplicates", before - papers.len());
            }
        }

        let summary = CitationEnricher::new(Arc::clone(&self.lookup), &self.cache)
            .with_pool_size(self.pool_size)
            .enrich(&mut papers, source)
            .await;
        if summary.failed > 0 {
            tracing::warn!("{} citation lookups failed", summary.failed);
        }

        if options.save {
            self.store()?
                .add_papers(&papers, source, Some(&query.keywords))?;
        }
        Ok(papers)
    }

    /// Acquire an artifact for a stored paper and record the result
    ///
    /// The download state is only updated on success; a failed attempt leaves
    /// any earlier artifact in place.
    pub async fn download(&self, id: &str) -> Result<Option<Outcome>, PipelineError> {
        let stored = self
            .store()?
            .get_paper_by_id(id)?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;

        let outcome = self.acquirer.acquire_paper(&stored.paper).await;
        if let Some(outcome) = outcome.as_ref().filter(|o| o.is_success()) {
            self.store()?
                .update_download_status(id, true, outcome.path())?;
        }
        Ok(outcome)
    }

    /// Acquire every stored paper that has no artifact yet, one at a time
    pub async fn download_pending(&self) -> Result<Vec<(String, Option<Outcome>)>, PipelineError> {
        let pending = self.store()?.get_pending_downloads()?;
        let mut results = Vec::with_capacity(pending.len());
        for stored in pending {
            let id = stored.paper.id;
            let outcome = self.download(&id).await?;
            results.push((id, outcome));
        }
        Ok(results)
    }

    /// Analyze a stored paper's artifact and save the result as its AI notes
    pub async fn analyze(
        &self,
        summarizer: &dyn Summarizer,
        id: &str,
    ) -> Result<String, PipelineError> {
        let stored = self
            .store()?
            .get_paper_by_id(id)?
            .ok_or_else(|| PipelineError::NotFound(id.to_string()))?;
        let analysis =
            ai::analyze_artifact(summarizer, &stored.paper, self.acquirer.artifacts()).await;
        self.store()?.update_ai_notes(id, &analysis)?;
        Ok(analysis)
    }

    /// Analyze every downloaded paper in the store
    pub async fn analyze_all(
        &self,
        summarizer: &dyn Summarizer,
    ) -> Result<Vec<(String, String)>, PipelineError> {
        let papers: Vec<Paper> = self
            .store()?
            .get_all_papers()?
            .into_iter()
            .map(|stored| stored.paper)
            .collect();
        let results = ai::analyze_batch(summarizer, &papers, self.acquirer.artifacts()).await;
        for (id, analysis) in &results {
            self.store()?.update_ai_notes(id, analysis)?;
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acquisition::ArtifactStore;
    use crate::ai::AiError;
    use crate::models::PaperBuilder;
    use crate::sources::MockSource;
    use async_trait::async_trait;

    #[derive(Debug)]
    struct FixedLookup;

    #[async_trait]
    impl CitationLookup for FixedLookup {
        async fn cited_by_count(
            &self,
            _source_id: &str,
            _source: ApiSource,
        ) -> Result<u32, SourceError> {
            Ok(7)
        }
    }

    struct Upper;

    #[async_trait]
    impl Summarizer for Upper {
        async fn analyze(&self, text: &str) -> Result<String, AiError> {
            Ok(text.to_uppercase())
        }
    }

    fn pubmed_paper(id: &str, pmid: &str) -> Paper {
        PaperBuilder::new(id, format!("Paper {}", pmid), ApiSource::PubMed)
            .pmid(pmid)
            .abstract_text(format!("Abstract {}.", pmid))
            .build()
    }

    fn pipeline(dir: &std::path::Path) -> Pipeline {
        let mock = MockSource::new(ApiSource::PubMed);
        mock.set_papers(vec![pubmed_paper("p1", "1"), pubmed_paper("p2", "2")]);
        let mut registry = SourceRegistry::empty();
        registry.register(Arc::new(mock));
        let registry = Arc::new(registry);

        let acquirer = Acquirer::with_client(
            HttpClient::with_user_agent("tests/1.0").unwrap(),
            Arc::clone(&registry),
            ArtifactStore::new(dir),
        );
        Pipeline::new(
            registry,
            Arc::new(FixedLookup),
            CitationCache::default(),
            acquirer,
            PaperStore::open_in_memory().unwrap(),
        )
    }

    #[tokio::test]
    async fn test_search_enriches_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let query = SearchQuery::new("malaria").max_results(5);

        let papers = pipeline
            .search(
                ApiSource::PubMed,
                &query,
                SearchOptions {
                    dedup: true,
                    save: true,
                },
            )
            .await
            .unwrap();

        assert_eq!(papers.len(), 2);
        assert!(papers.iter().all(|p| p.citation_count == 7));
        assert_eq!(pipeline.store().unwrap().count().unwrap(), 2);
        assert_eq!(pipeline.store().unwrap().keywords("p1").unwrap(), vec!["malaria"]);
    }

    #[tokio::test]
    async fn test_search_unregistered_source() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        let result = pipeline
            .search(
                ApiSource::Crossref,
                &SearchQuery::new("x"),
                SearchOptions::default(),
            )
            .await;
        assert!(matches!(result, Err(PipelineError::Source(SourceError::NotFound(_)))));
    }

    #[tokio::test]
    async fn test_download_and_analyze() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        pipeline
            .search(
                ApiSource::PubMed,
                &SearchQuery::new("malaria"),
                SearchOptions {
                    dedup: false,
                    save: true,
                },
            )
            .await
            .unwrap();

        let outcome = pipeline.download("p1").await.unwrap().unwrap();
        assert_eq!(outcome.kind(), "abstract");
        let stored = pipeline.store().unwrap().get_paper_by_id("p1").unwrap().unwrap();
        assert!(stored.paper.downloaded);
        assert_eq!(stored.local_path.as_deref(), outcome.path());

        let analysis = pipeline.analyze(&Upper, "p1").await.unwrap();
        assert_eq!(analysis, "ABSTRACT 1.");

        let batch = pipeline.analyze_all(&Upper).await.unwrap();
        assert_eq!(batch.len(), 1);

        assert!(matches!(
            pipeline.download("missing").await,
            Err(PipelineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_download_pending() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path());
        pipeline
            .search(
                ApiSource::PubMed,
                &SearchQuery::new("malaria"),
                SearchOptions {
                    dedup: false,
                    save: true,
                },
            )
            .await
            .unwrap();

        let results = pipeline.download_pending().await.unwrap();
        assert_eq!(results.len(), 2);
        assert!(pipeline.store().unwrap().get_pending_downloads().unwrap().is_empty());
    }
}
