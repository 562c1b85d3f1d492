//! Strategy-chain acquisition of PDFs and abstracts.

use std::path::PathBuf;
use std::sync::Arc;

use super::html;
use super::strategy::{crossref_plan, full_text_plan, LandingPage, Strategy};
use super::{AcquireError, ArtifactKind, ArtifactStore};
use crate::config::{Config, HttpConfig};
use crate::models::{ApiSource, Outcome, Paper};
use crate::sources::eutils::{self, PMC_ARTICLE_BASE};
use crate::sources::{SourceError, SourceRegistry};
use crate::utils::{looks_like_pdf, HttpClient};

const DOI_RESOLVER: &str = "https://doi.org";

/// Obtains a PDF or abstract for a paper and writes it to the download
/// directory as `<id>.pdf` or `<id>.txt`
#[derive(Debug, Clone)]
pub struct Acquirer {
    client: HttpClient,
    registry: Arc<SourceRegistry>,
    artifacts: ArtifactStore,
    doi_resolver: String,
    mirror_base: Option<String>,
    pmc_base: String,
}

impl Acquirer {
    /// Create an acquirer with default endpoints and no mirror
    pub fn new(
        registry: Arc<SourceRegistry>,
        download_dir: impl Into<PathBuf>,
    ) -> Result<Self, SourceError> {
        let client = HttpClient::from_settings(&HttpConfig::default().browser_settings())?;
        Ok(Self::with_client(
            client,
            registry,
            ArtifactStore::new(download_dir),
        ))
    }

    /// Create from configuration
    pub fn from_config(config: &Config, registry: Arc<SourceRegistry>) -> Result<Self, SourceError> {
        let client = HttpClient::from_settings(&config.http.browser_settings())?;
        Ok(
            Self::with_client(client, registry, ArtifactStore::new(&config.downloads.directory))
                .with_doi_resolver(&config.endpoints.doi_resolver)
                .with_pmc_base(&config.endpoints.pmc)
                .with_mirror(config.endpoints.mirror().map(String::from)),
        )
    }

    /// Create with an explicit client for landing pages and downloads
    pub fn with_client(
        client: HttpClient,
        registry: Arc<SourceRegistry>,
        artifacts: ArtifactStore,
    ) -> Self {
        Self {
            client,
            registry,
            artifacts,
            doi_resolver: DOI_RESOLVER.to_string(),
            mirror_base: None,
            pmc_base: PMC_ARTICLE_BASE.to_string(),
        }
    }

    pub fn with_doi_resolver(mut self, base: impl Into<String>) -> Self {
        self.doi_resolver = base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_mirror(mut self, base: Option<String>) -> Self {
        self.mirror_base = base
            .map(|b| b.trim().trim_end_matches('/').to_string())
            .filter(|b| !b.is_empty());
        self
    }

    pub fn with_pmc_base(mut self, base: impl Into<String>) -> Self {
        self.pmc_base = base.into();
        self
    }

    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Acquire an artifact for `paper` through the path for `api_source`
    ///
    /// `None` means nothing could be acquired: the source is unsupported, or
    /// a PubMed / PMC record had neither a usable link nor an abstract.
    /// Crossref acquisition always reports an outcome, failures included.
    pub async fn acquire(&self, paper: &Paper, api_source: &str) -> Option<Outcome> {
        let source = match api_source.parse::<ApiSource>() {
            Ok(source) => source,
            Err(e) => {
                tracing::warn!("Cannot acquire '{}': {}", paper.title, e);
                return None;
            }
        };

        let outcome = match source {
            ApiSource::Crossref => Some(self.acquire_crossref(paper).await),
            ApiSource::PubMed => self.acquire_pubmed(paper).await,
            ApiSource::Pmc => self.acquire_pmc(paper).await,
        };

        match &outcome {
            Some(outcome) => tracing::info!("'{}' ({}): {}", paper.title, paper.id, outcome),
            None => tracing::warn!("'{}' ({}): nothing acquired", paper.title, paper.id),
        }
        outcome
    }

    /// Acquire through the path of the API that produced the paper
    pub async fn acquire_paper(&self, paper: &Paper) -> Option<Outcome> {
        self.acquire(paper, paper.api_source.id()).await
    }

    async fn acquire_crossref(&self, paper: &Paper) -> Outcome {
        let Some(doi) = paper.doi.as_deref().map(str::trim).filter(|d| !d.is_empty()) else {
            return Outcome::error("paper has no DOI to resolve");
        };

        let mut failures = Vec::new();
        let landing = match self.fetch_page(&format!("{}/{}", self.doi_resolver, doi)).await {
            Ok(page) => Some(page),
            Err(e) => {
                tracing::debug!("DOI {} did not resolve: {}", doi, e);
                failures.push(format!("landing page: {}", e));
                None
            }
        };

        let plan = crossref_plan(landing.as_ref(), doi, self.mirror_base.as_deref());
        match self.run_plan(&paper.id, &plan).await {
            Ok(outcome) => outcome,
            Err(mut errors) => {
                failures.append(&mut errors);
                Outcome::error(format!(
                    "no PDF or abstract for DOI {}: {}",
                    doi,
                    failures.join("; ")
                ))
            }
        }
    }

    async fn acquire_pubmed(&self, paper: &Paper) -> Option<Outcome> {
        let refreshed = match paper.pmid.as_deref() {
            Some(pmid) => self.details(ApiSource::PubMed, pmid).await,
            None => None,
        };
        let record = refreshed.as_ref().unwrap_or(paper);

        let plan = full_text_plan(record.pdf_url.as_deref(), &record.r#abstract);
        self.run_optional(paper, &plan).await
    }

    async fn acquire_pmc(&self, paper: &Paper) -> Option<Outcome> {
        let Some(pmcid) = paper.pmcid.as_deref() else {
            tracing::warn!("PMC paper '{}' has no PMC id", paper.title);
            return None;
        };
        let pdf_url = eutils::pmc_pdf_url(&self.pmc_base, pmcid);

        let refreshed = if paper.has_abstract() {
            None
        } else {
            self.details(ApiSource::Pmc, pmcid).await
        };
        let abstract_text = refreshed
            .as_ref()
            .map(|p| p.r#abstract.as_str())
            .unwrap_or(paper.r#abstract.as_str());

        let plan = full_text_plan(Some(&pdf_url), abstract_text);
        self.run_optional(paper, &plan).await
    }

    async fn run_optional(&self, paper: &Paper, plan: &[Strategy<'_>]) -> Option<Outcome> {
        if plan.is_empty() {
            tracing::warn!("'{}' has neither a full-text link nor an abstract", paper.title);
            return None;
        }
        match self.run_plan(&paper.id, plan).await {
            Ok(outcome) => Some(outcome),
            Err(errors) => {
                tracing::warn!("Acquisition of '{}' failed: {}", paper.title, errors.join("; "));
                None
            }
        }
    }

    async fn details(&self, source: ApiSource, source_id: &str) -> Option<Paper> {
        let adapter = self.registry.get(source)?;
        adapter.fetch_details(source_id).await
    }

    /// First successful strategy, or every failure in order
    async fn run_plan(&self, id: &str, plan: &[Strategy<'_>]) -> Result<Outcome, Vec<String>> {
        let mut failures = Vec::new();
        for strategy in plan {
            match self.attempt(id, strategy).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    tracing::debug!("{} strategy for {} failed: {}", strategy.label(), id, e);
                    failures.push(format!("{}: {}", strategy.label(), e));
                }
            }
        }
        Err(failures)
    }

    async fn attempt(&self, id: &str, strategy: &Strategy<'_>) -> Result<Outcome, AcquireError> {
        match *strategy {
            Strategy::PagePdfLink(page) => {
                if page.is_pdf() {
                    return self.save(id, ArtifactKind::Pdf, &page.body).await;
                }
                let link = html::find_pdf_link(&page.html(), &page.final_url)
                    .ok_or_else(|| AcquireError::NotFound("no PDF link on landing page".into()))?;
                let bytes = self.download_pdf(link.as_str()).await?;
                self.save(id, ArtifactKind::Pdf, &bytes).await
            }
            Strategy::Mirror { base, doi } => {
                let page = self.fetch_page(&format!("{}/{}", base, doi)).await?;
                if page.is_pdf() {
                    return self.save(id, ArtifactKind::Pdf, &page.body).await;
                }
                let link = html::find_mirror_pdf(&page.html(), &page.final_url)
                    .ok_or_else(|| AcquireError::NotFound("mirror page has no PDF".into()))?;
                let bytes = self.download_pdf(link.as_str()).await?;
                self.save(id, ArtifactKind::Pdf, &bytes).await
            }
            Strategy::PageAbstract(page) => {
                let text = if page.is_pdf() {
                    None
                } else {
                    html::extract_abstract(&page.html())
                };
                let text = text
                    .ok_or_else(|| AcquireError::NotFound("no abstract on landing page".into()))?;
                self.save(id, ArtifactKind::Abstract, text.as_bytes()).await
            }
            Strategy::FullTextLink(url) => {
                let bytes = self.download_pdf(url).await?;
                self.save(id, ArtifactKind::Pdf, &bytes).await
            }
            Strategy::AbstractText(text) => {
                self.save(id, ArtifactKind::Abstract, text.as_bytes()).await
            }
        }
    }

    async fn save(&self, id: &str, kind: ArtifactKind, bytes: &[u8]) -> Result<Outcome, AcquireError> {
        if bytes.is_empty() {
            return Err(AcquireError::NotFound("empty artifact".into()));
        }
        let path = self.artifacts.write(id, kind, bytes).await?;
        Ok(match kind {
            ArtifactKind::Pdf => Outcome::Pdf { path },
            ArtifactKind::Abstract => Outcome::Abstract { path },
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<LandingPage, AcquireError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        let final_url = response.url().clone();
        if !status.is_success() {
            return Err(AcquireError::Status {
                status: status.as_u16(),
                url: final_url.to_string(),
            });
        }

        let content_type = content_type(&response);
        let body = response.bytes().await?.to_vec();
        Ok(LandingPage {
            final_url,
            content_type,
            body,
        })
    }

    async fn download_pdf(&self, url: &str) -> Result<Vec<u8>, AcquireError> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AcquireError::Status {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let content_type = content_type(&response);
        let bytes = response.bytes().await?.to_vec();

        if looks_like_pdf(&bytes) || (content_type.contains("pdf") && !bytes.is_empty()) {
            Ok(bytes)
        } else {
            Err(AcquireError::NotPdf(format!(
                "{} served {}",
                url,
                if content_type.is_empty() { "no content type" } else { content_type.as_str() }
            )))
        }
    }
}

fn content_type(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase()
}
