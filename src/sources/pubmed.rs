//! PubMed research source implementation using E-utilities API.

use async_trait::async_trait;
use std::sync::Arc;

use crate::identity;
use crate::models::{ApiSource, Paper, PaperBuilder, RecentWindow, SearchQuery};
use crate::sources::eutils::{self, EUTILS_BASE, PMC_ARTICLE_BASE};
use crate::sources::{check_query, degrade, Source, SourceCapabilities, SourceError};
use crate::utils::xml::{self, XmlElement};
use crate::utils::HttpClient;

const PUBMED_WEB_BASE: &str = "https://pubmed.ncbi.nlm.nih.gov";

/// PubMed research source
///
/// Two-phase: esearch returns PMIDs, then one efetch per PMID. Setting
/// [`SearchQuery::recent`] switches to the date-sorted "recent" mode.
#[derive(Debug, Clone)]
pub struct PubMedSource {
    client: Arc<HttpClient>,
    eutils_base: String,
    pmc_base: String,
}

impl PubMedSource {
    /// Create a new PubMed source
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

    /// Recently published papers, newest first
    pub async fn search_recent(
        &self,
        keywords: &str,
        window: RecentWindow,
        max_results: usize,
    ) -> Result<Vec<Paper>, SourceError> {
        let query = SearchQuery::new(keywords)
            .max_results(max_results)
            .recent(window);
        self.search(&query).await
    }

    async fn try_search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let today = chrono::Local::now().date_naive();
        let params = eutils::esearch_params("pubmed", query, None, today);
        let ids = eutils::esearch(&self.client, &self.eutils_base, &params).await?;
        tracing::debug!("PubMed esearch returned {} ids", ids.len());

        let mut papers = Vec::new();
        for pmid in ids.iter().take(query.effective_max()) {
            if let Some(paper) = self.fetch_record(pmid).await {
                papers.push(paper);
            }
        }
        Ok(papers)
    }

    /// Fetch and parse one record; failures are logged and skipped
    async fn fetch_record(&self, pmid: &str) -> Option<Paper> {
        let body = match eutils::efetch(&self.client, &self.eutils_base, "pubmed", pmid).await {
            Ok(Some(body)) => body,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Skipping PubMed record {}: {}", pmid, e);
                return None;
            }
        };

        match parse_efetch(&body, &self.pmc_base) {
            Ok(mut papers) if !papers.is_empty() => Some(papers.remove(0)),
            Ok(_) => {
                tracing::warn!("PubMed record {} contained no article", pmid);
                None
            }
            Err(e) => {
                tracing::warn!("Skipping malformed PubMed record {}: {}", pmid, e);
                None
            }
        }
    }
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    fn api_source(&self) -> ApiSource {
        ApiSource::PubMed
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
                    "PubMed returned {} papers for '{}'",
                    papers.len(),
                    query.keywords
                );
                Ok(papers)
            }
            Err(e) => Ok(degrade(self.id(), query, e)),
        }
    }

    async fn fetch_details(&self, pmid: &str) -> Option<Paper> {
        self.fetch_record(pmid.trim()).await
    }
}

/// Parse an efetch `PubmedArticleSet` document
pub fn parse_efetch(xml_text: &str, pmc_base: &str) -> Result<Vec<Paper>, SourceError> {
    let doc = xml::parse(xml_text)?;
    Ok(doc
        .find_all("PubmedArticle")
        .into_iter()
        .filter_map(|article| parse_article(article, pmc_base))
        .collect())
}

fn parse_article(article: &XmlElement, pmc_base: &str) -> Option<Paper> {
    let citation = article.find("MedlineCitation")?;
    let pmid = citation
        .child("PMID")
        .map(|e| e.clean_text())
        .unwrap_or_default();

    let title = citation.find_text("ArticleTitle").unwrap_or_default();

    let abstract_text = citation
        .find_all("Abstract/AbstractText")
        .into_iter()
        .map(|section| {
            let text = section.clean_text();
            match section.attr("Label") {
                Some(label) if !text.is_empty() => format!("{}: {}", label, text),
                _ => text,
            }
        })
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let authors = citation
        .find_all("AuthorList/Author")
        .into_iter()
        .filter_map(author_name)
        .collect::<Vec<_>>();

    let year = publication_year(citation);
    let doi = find_doi(article).unwrap_or_default();

    let pmcid = article
        .find_all("PubmedData/ArticleIdList/ArticleId")
        .into_iter()
        .find(|e| e.attr("IdType") == Some("pmc"))
        .map(|e| eutils::strip_pmc_prefix(&e.clean_text()).to_string())
        .unwrap_or_default();

    let publication_type = citation
        .find_text("PublicationTypeList/PublicationType")
        .unwrap_or_default();

    let id = identity::resolve_id(Some(doi.as_str()));
    tracing::info!("PubMed record: '{}' (PMID: {}, DOI: {})", title, pmid, doi);

    let mut builder = PaperBuilder::new(id, title, ApiSource::PubMed)
        .authors(authors)
        .abstract_text(abstract_text)
        .year(year)
        .doi(doi)
        .url(format!("{}/{}/", PUBMED_WEB_BASE, pmid))
        .pmid(pmid)
        .publication_type(publication_type);

    if !pmcid.is_empty() {
        builder = builder
            .pdf_url(eutils::pmc_pdf_url(pmc_base, &pmcid))
            .pmcid(pmcid);
    }
    Some(builder.build())
}

/// DOI locations in order of preference
fn find_doi(article: &XmlElement) -> Option<String> {
    let from_ids = article
        .find_all("PubmedData/ArticleIdList/ArticleId")
        .into_iter()
        .find(|e| e.attr("IdType") == Some("doi"))
        .map(|e| e.clean_text());

    let from_elocation = || {
        article
            .find_all("Article/ELocationID")
            .into_iter()
            .find(|e| e.attr("EIdType") == Some("doi"))
            .map(|e| e.clean_text())
    };

    from_ids
        .filter(|d| !d.is_empty())
        .or_else(|| from_elocation().filter(|d| !d.is_empty()))
}

fn author_name(author: &XmlElement) -> Option<String> {
    if let Some(collective) = author.find_text("CollectiveName") {
        return Some(collective);
    }
    let name = [author.find_text("ForeName"), author.find_text("LastName")]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    (!name.is_empty()).then_some(name)
}

fn publication_year(citation: &XmlElement) -> Option<i32> {
    let pub_date = citation.find("JournalIssue/PubDate");
    pub_date
        .and_then(|d| d.find_text("Year"))
        .or_else(|| pub_date.and_then(|d| d.find_text("MedlineDate")))
        .or_else(|| citation.find_text("ArticleDate/Year"))
        .and_then(|raw| leading_year(&raw))
}

/// First four-digit run in a date string such as `2020 Nov-Dec`
pub(crate) fn leading_year(raw: &str) -> Option<i32> {
    let digits: String = raw
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    if digits.len() == 4 {
        digits.parse().ok()
    } else {
        None
    }
}
