//! PubMed Central (PMC) research source implementation.

use async_trait::async_trait;
use std::sync::Arc;

use crate::identity;
use crate::models::{ApiSource, Paper, PaperBuilder, SearchQuery};
use crate::sources::eutils::{self, EUTILS_BASE, PMC_ARTICLE_BASE};
use crate::sources::pubmed::leading_year;
use crate::sources::{check_query, degrade, Source, SourceCapabilities, SourceError};
use crate::utils::xml::{self, XmlElement};
use crate::utils::HttpClient;

/// Restricts esearch to articles PMC may redistribute
const OPEN_ACCESS_FILTER: &str = "open access[filter]";

/// PMC research source
///
/// Searches the open-access subset of PubMed Central. Every record carries
/// the PMC PDF location as its full-text link.
#[derive(Debug, Clone)]
pub struct PmcSource {
    client: Arc<HttpClient>,
    eutils_base: String,
    pmc_base: String,
}

impl PmcSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_endpoints(
            Arc::new(HttpClient::new()?),
            EUTILS_BASE,
            PMC_ARTICLE_BASE,
        ))
    }

    /// Create against specific E-utilities and PMC bases
    pub fn with_endpoints(
        client: Arc<HttpClient>,
        eutils_base: impl Into<String>,
        pmc_base: impl Into<String>,
    ) -> Self {
        Self {
            client,
            eutils_base: eutils_base.into(),
            pmc_base: pmc_base.into(),
        }
    }

    async fn try_search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let today = chrono::Local::now().date_naive();
        let params = eutils::esearch_params("pmc", query, Some(OPEN_ACCESS_FILTER), today);
        let ids = eutils::esearch(&self.client, &self.eutils_base, &params).await?;
        tracing::debug!("PMC esearch returned {} ids", ids.len());

        let mut papers = Vec::new();
        for id in ids.iter().take(query.effective_max()) {
            if let Some(paper) = self.fetch_record(id).await {
                papers.push(paper);
            }
        }
        Ok(papers)
    }

    async fn fetch_record(&self, pmcid: &str) -> Option<Paper> {
        let id = eutils::strip_pmc_prefix(pmcid);
        let body = match eutils::efetch(&self.client, &self.eutils_base, "pmc", id).await {
            Ok(Some(body)) => body,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Skipping PMC record {}: {}", id, e);
                return None;
            }
        };

        match parse_efetch(&body, id, &self.pmc_base) {
            Ok(paper) => paper,
            Err(e) => {
                tracing::warn!("Skipping malformed PMC record {}: {}", id, e);
                None
            }
        }
    }
}

#[async_trait]
impl Source for PmcSource {
    fn id(&self) -> &str {
        "pmc"
    }

    fn name(&self) -> &str {
        "PubMed Central"
    }

    fn api_source(&self) -> ApiSource {
        ApiSource::Pmc
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::SEARCH
            | SourceCapabilities::DETAILS
            | SourceCapabilities::DOWNLOAD
            | SourceCapabilities::CITATIONS
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        check_query(query)?;
        match self.try_search(query).await {
            Ok(papers) => {
                tracing::info!(
                    "PMC returned {} papers for '{}'",
                    papers.len(),
                    query.keywords
                );
                Ok(papers)
            }
            Err(e) => Ok(degrade(self.id(), query, e)),
        }
    }

    async fn fetch_details(&self, pmcid: &str) -> Option<Paper> {
        self.fetch_record(pmcid).await
    }
}

/// Parse a `pmc-articleset` efetch document holding one article
///
/// `requested_id` is used when the article carries no `pmc` article-id.
pub fn parse_efetch(
    xml_text: &str,
    requested_id: &str,
    pmc_base: &str,
) -> Result<Option<Paper>, SourceError> {
    let doc = xml::parse(xml_text)?;
    Ok(doc
        .find("article")
        .map(|article| parse_article(article, requested_id, pmc_base)))
}

fn parse_article(article: &XmlElement, requested_id: &str, pmc_base: &str) -> Paper {
    let meta = article.find("article-meta");
    let article_id = |kind: &str| {
        meta.into_iter()
            .flat_map(|m| m.find_all("article-id"))
            .find(|e| e.attr("pub-id-type") == Some(kind))
            .map(|e| e.clean_text())
            .filter(|v| !v.is_empty())
    };

    let pmcid = article_id("pmc")
        .or_else(|| article_id("pmcid"))
        .map(|v| eutils::strip_pmc_prefix(&v).to_string())
        .unwrap_or_else(|| eutils::strip_pmc_prefix(requested_id).to_string());
    let doi = article_id("doi").unwrap_or_default();
    let pmid = article_id("pmid").unwrap_or_default();

    let title = meta
        .and_then(|m| m.find_text("title-group/article-title"))
        .or_else(|| article.find_text("article-title"))
        .unwrap_or_default();

    let authors = article
        .find_all("contrib-group/contrib")
        .into_iter()
        .filter(|c| c.attr("contrib-type") == Some("author"))
        .filter_map(contributor_name)
        .collect::<Vec<_>>();

    let year = meta
        .into_iter()
        .flat_map(|m| m.find_all("pub-date"))
        .filter_map(|d| d.find_text("year"))
        .find_map(|raw| leading_year(&raw));

    let id = identity::resolve_id(Some(doi.as_str()));
    tracing::info!("PMC record: '{}' (PMC{}, DOI: {})", title, pmcid, doi);

    PaperBuilder::new(id, title, ApiSource::Pmc)
        .authors(authors)
        .abstract_text(extract_abstract(article).unwrap_or_default())
        .year(year)
        .doi(doi)
        .pmid(pmid)
        .url(eutils::pmc_article_url(pmc_base, &pmcid))
        .pdf_url(eutils::pmc_pdf_url(pmc_base, &pmcid))
        .publication_type(article.attr("article-type").unwrap_or_default())
        .pmcid(pmcid)
        .build()
}

/// First non-empty abstract, trying the flattened element, then its
/// paragraphs, then any non-empty abstract held in the article metadata
pub fn extract_abstract(article: &XmlElement) -> Option<String> {
    let flattened = || article.find_text("abstract");

    let paragraphs = || {
        let joined = article
            .find_all("abstract/p")
            .into_iter()
            .map(|p| p.clean_text())
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        (!joined.is_empty()).then_some(joined)
    };

    let metadata = || {
        article
            .find_all("article-meta/abstract")
            .into_iter()
            .map(|a| a.clean_text())
            .find(|t| !t.is_empty())
    };

    flattened().or_else(paragraphs).or_else(metadata)
}

fn contributor_name(contrib: &XmlElement) -> Option<String> {
    if let Some(name) = contrib.find("name") {
        let full = [name.find_text("given-names"), name.find_text("surname")]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" ");
        if !full.is_empty() {
            return Some(full);
        }
    }
    contrib
        .find_text("collab")
        .or_else(|| contrib.find_text("string-name"))
}
