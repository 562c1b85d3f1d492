//! Registry for the upstream API adapters.

use std::collections::HashMap;
use std::sync::Arc;

use super::{CrossrefSource, PmcSource, PubMedSource, Source, SourceError};
use crate::config::EndpointsConfig;
use crate::models::ApiSource;
use crate::utils::HttpClient;

bitflags::bitflags! {
    /// Capabilities that a source can support
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SourceCapabilities: u32 {
        const SEARCH = 1 << 0;
        /// Re-fetch a single record by its source identifier
        const DETAILS = 1 << 1;
        const DOWNLOAD = 1 << 2;
        const CITATIONS = 1 << 3;
    }
}

/// Registry of the adapters, keyed by the API they talk to
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: HashMap<ApiSource, Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn empty() -> Self {
        Self::default()
    }

    /// Create a registry with every adapter against the public endpoints
    pub fn new() -> Result<Self, SourceError> {
        let client = Arc::new(HttpClient::new()?);
        Ok(Self::from_endpoints(client, &EndpointsConfig::default()))
    }

    /// Create a registry with every adapter against the configured endpoints
    pub fn from_endpoints(client: Arc<HttpClient>, endpoints: &EndpointsConfig) -> Self {
        let mut registry = Self::empty();
        registry.register(Arc::new(CrossrefSource::with_base_url(
            Arc::clone(&client),
            &endpoints.crossref,
        )));
        registry.register(Arc::new(PubMedSource::with_endpoints(
            Arc::clone(&client),
            &endpoints.eutils,
            &endpoints.pmc,
        )));
        registry.register(Arc::new(PmcSource::with_endpoints(
            client,
            &endpoints.eutils,
            &endpoints.pmc,
        )));
        registry
    }

    /// Register a source, replacing any adapter for the same API
    pub fn register(&mut self, source: Arc<dyn Source>) {
        self.sources.insert(source.api_source(), source);
    }

    /// Get the adapter for an API
    pub fn get(&self, api_source: ApiSource) -> Option<&Arc<dyn Source>> {
        self.sources.get(&api_source)
    }

    /// Get the adapter for an API, returning an error if not registered
    pub fn get_required(&self, api_source: ApiSource) -> Result<&Arc<dyn Source>, SourceError> {
        self.get(api_source).ok_or_else(|| {
            SourceError::NotFound(format!("Source '{}' not registered", api_source))
        })
    }

    /// Get all registered sources
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.values()
    }

    /// Get sources that support a specific capability
    pub fn with_capability(&self, capability: SourceCapabilities) -> Vec<&Arc<dyn Source>> {
        self.all()
            .filter(|s| s.capabilities().contains(capability))
            .collect()
    }

    pub fn has(&self, api_source: ApiSource) -> bool {
        self.sources.contains_key(&api_source)
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MockSource;

    #[test]
    fn test_registry_basic() {
        let registry = SourceRegistry::new().unwrap();

        assert_eq!(registry.len(), 3);
        for api in ApiSource::ALL {
            let source = registry.get(api).unwrap();
            assert_eq!(source.api_source(), api);
            assert_eq!(source.id(), api.id());
        }
    }

    #[test]
    fn test_with_capability() {
        let registry = SourceRegistry::new().unwrap();
        assert_eq!(
            registry.with_capability(SourceCapabilities::DETAILS).len(),
            3
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = SourceRegistry::empty();
        assert!(registry.get_required(ApiSource::PubMed).is_err());

        registry.register(Arc::new(MockSource::new(ApiSource::PubMed)));
        registry.register(Arc::new(MockSource::new(ApiSource::PubMed)));
        assert_eq!(registry.len(), 1);
        assert!(registry.has(ApiSource::PubMed));
        assert_eq!(registry.get(ApiSource::PubMed).unwrap().id(), "mock");
    }
}
