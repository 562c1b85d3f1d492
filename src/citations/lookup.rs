//! Secondary "cited-by" lookups.

use async_trait::async_trait;
use std::sync::Arc;

use crate::models::ApiSource;
use crate::sources::eutils::{self, EUTILS_BASE};
use crate::sources::SourceError;
use crate::utils::HttpClient;

/// Count how many records cite a given record
#[async_trait]
pub trait CitationLookup: Send + Sync + std::fmt::Debug {
    async fn cited_by_count(&self, source_id: &str, source: ApiSource)
        -> Result<u32, SourceError>;
}

/// NCBI elink "cited in" counts for PubMed and PMC records
#[derive(Debug, Clone)]
pub struct EutilsCitationLookup {
    client: Arc<HttpClient>,
    base_url: String,
}

impl EutilsCitationLookup {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_base_url(Arc::new(HttpClient::new()?), EUTILS_BASE))
    }

    pub fn with_base_url(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// elink database and link name for a source
    fn link_for(source: ApiSource) -> Option<(&'static str, &'static str)> {
        match source {
            ApiSource::PubMed => Some(("pubmed", "pubmed_pubmed_citedin")),
            ApiSource::Pmc => Some(("pmc", "pmc_pmc_citedby")),
            ApiSource::Crossref => None,
        }
    }
}

#[async_trait]
impl CitationLookup for EutilsCitationLookup {
    async fn cited_by_count(
        &self,
        source_id: &str,
        source: ApiSource,
    ) -> Result<u32, SourceError> {
        let (db, linkname) = Self::link_for(source).ok_or_else(|| {
            SourceError::InvalidRequest(format!("no cited-by link for {} records", source))
        })?;

        let id = match source {
            ApiSource::Pmc => eutils::strip_pmc_prefix(source_id),
            _ => source_id.trim(),
        };

        let url = format!("{}/elink.fcgi", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[
                ("dbfrom", db),
                ("db", db),
                ("linkname", linkname),
                ("id", id),
                ("retmode", "json"),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "elink returned status: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        eutils::parse_elink_count(&body, linkname)
    }
}
