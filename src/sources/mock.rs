//! Mock source for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

use crate::models::{ApiSource, Paper, SearchQuery};
use crate::sources::{check_query, Source, SourceCapabilities, SourceError};

/// A mock source that returns predefined records
///
/// Stands in for any of the real adapters (it reports the configured
/// [`ApiSource`]) so registries and pipelines can be exercised offline.
#[derive(Debug)]
pub struct MockSource {
    api_source: ApiSource,
    papers: Mutex<Vec<Paper>>,
    details: Mutex<HashMap<String, Paper>>,
    search_calls: AtomicUsize,
}

impl MockSource {
    /// Create a new mock source standing in for `api_source`
    pub fn new(api_source: ApiSource) -> Self {
        Self {
            api_source,
            papers: Mutex::new(Vec::new()),
            details: Mutex::new(HashMap::new()),
            search_calls: AtomicUsize::new(0),
        }
    }

    /// Set the records returned by `search`
    pub fn set_papers(&self, papers: Vec<Paper>) {
        *lock(&self.papers) = papers;
    }

    /// Register a record returned by `fetch_details` for `source_id`
    pub fn set_details(&self, source_id: &str, paper: Paper) {
        lock(&self.details).insert(source_id.to_string(), paper);
    }

    /// Number of `search` calls made so far
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        "mock"
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn api_source(&self) -> ApiSource {
        self.api_source
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH | SourceCapabilities::DETAILS
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        check_query(query)?;
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        let papers = lock(&self.papers);
        Ok(papers.iter().take(query.effective_max()).cloned().collect())
    }

    async fn fetch_details(&self, source_id: &str) -> Option<Paper> {
        lock(&self.details).get(source_id).cloned()
    }
}

/// Helper function to create a mock paper for testing
pub fn make_paper(id: &str, title: &str, api_source: ApiSource) -> Paper {
    let mut paper = Paper::new(id.to_string(), title.to_string(), api_source);
    paper.url = format!("http://example.com/{}", id);
    paper
}
