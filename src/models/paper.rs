//! Paper model representing a bibliographic record from any upstream API.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// The upstream API a record was produced by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiSource {
    Crossref,
    PubMed,
    Pmc,
}

impl ApiSource {
    /// All supported sources, in display order
    pub const ALL: [ApiSource; 3] = [ApiSource::Crossref, ApiSource::PubMed, ApiSource::Pmc];

    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            ApiSource::Crossref => "Crossref",
            ApiSource::PubMed => "PubMed",
            ApiSource::Pmc => "PubMed Central",
        }
    }

    /// Returns the source identifier (stored alongside records)
    pub fn id(&self) -> &'static str {
        match self {
            ApiSource::Crossref => "crossref",
            ApiSource::PubMed => "pubmed",
            ApiSource::Pmc => "pmc",
        }
    }
}

impl std::fmt::Display for ApiSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// Raised when a source identifier is not one of the supported APIs
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unsupported API source: {0}")]
pub struct UnsupportedSource(pub String);

impl FromStr for ApiSource {
    type Err = UnsupportedSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "crossref" => Ok(ApiSource::Crossref),
            "pubmed" => Ok(ApiSource::PubMed),
            "pmc" => Ok(ApiSource::Pmc),
            other => Err(UnsupportedSource(other.to_string())),
        }
    }
}

/// A research paper normalized from any upstream API
///
/// Adapters produce these, the citation enricher and the caller mutate
/// `citation_count` and `downloaded` in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Paper {
    /// Session-stable, filename-safe identifier (see [`crate::identity`])
    pub id: String,

    /// Paper title
    pub title: String,

    /// Abstract text, empty when the source did not supply one
    pub r#abstract: String,

    /// Author display names in source order
    pub authors: Vec<String>,

    /// Publication year
    pub year: Option<i32>,

    /// Digital Object Identifier
    pub doi: Option<String>,

    /// PubMed identifier
    pub pmid: Option<String>,

    /// PubMed Central identifier (numeric part, without the `PMC` prefix)
    pub pmcid: Option<String>,

    /// Landing page URL
    pub url: String,

    /// Known full-text link
    pub pdf_url: Option<String>,

    /// Publication type as reported by the source
    pub publication_type: Option<String>,

    /// API that produced this record
    pub api_source: ApiSource,

    /// Citation count, zero until enriched
    pub citation_count: u32,

    /// Whether an artifact has been acquired for this paper
    pub downloaded: bool,

    /// Free-text user notes
    pub notes: Option<String>,

    /// AI-generated analysis
    pub ai_notes: Option<String>,
}

impl Paper {
    /// Create a new paper with required fields
    pub fn new(id: String, title: String, api_source: ApiSource) -> Self {
        Self {
            id,
            title,
            r#abstract: String::new(),
            authors: Vec::new(),
            year: None,
            doi: None,
            pmid: None,
            pmcid: None,
            url: String::new(),
            pdf_url: None,
            publication_type: None,
            api_source,
            citation_count: 0,
            downloaded: false,
            notes: None,
            ai_notes: None,
        }
    }

    /// The identifier the source itself uses for this record
    pub fn source_id(&self) -> Option<&str> {
        match self.api_source {
            ApiSource::Crossref => self.doi.as_deref(),
            ApiSource::PubMed => self.pmid.as_deref(),
            ApiSource::Pmc => self.pmcid.as_deref(),
        }
    }

    /// Authors joined for display
    pub fn author_line(&self) -> String {
        self.authors.join("; ")
    }

    pub fn has_abstract(&self) -> bool {
        !self.r#abstract.trim().is_empty()
    }
}

/// Builder for constructing Paper objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: Paper,
}

impl PaperBuilder {
    /// Create a new builder with required fields
    pub fn new(id: impl Into<String>, title: impl Into<String>, api_source: ApiSource) -> Self {
        Self {
            paper: Paper::new(id.into(), title.into(), api_source),
        }
    }

    pub fn authors(mut self, authors: Vec<String>) -> Self {
        self.paper.authors = authors;
        self
    }

    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.paper.r#abstract = abstract_text.into();
        self
    }

    pub fn year(mut self, year: Option<i32>) -> Self {
        self.paper.year = year;
        self
    }

    /// Set DOI, ignoring empty values
    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.paper.doi = non_empty(doi.into());
        self
    }

    pub fn pmid(mut self, pmid: impl Into<String>) -> Self {
        self.paper.pmid = non_empty(pmid.into());
        self
    }

    pub fn pmcid(mut self, pmcid: impl Into<String>) -> Self {
        self.paper.pmcid = non_empty(pmcid.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.paper.url = url.into();
        self
    }

    pub fn pdf_url(mut self, url: impl Into<String>) -> Self {
        self.paper.pdf_url = non_empty(url.into());
        self
    }

    pub fn publication_type(mut self, kind: impl Into<String>) -> Self {
        self.paper.publication_type = non_empty(kind.into());
        self
    }

    pub fn citation_count(mut self, count: u32) -> Self {
        self.paper.citation_count = count;
        self
    }

    /// Build the Paper
    pub fn build(self) -> Paper {
        self.paper
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
