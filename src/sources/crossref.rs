//! Crossref research source implementation.

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use std::sync::{Arc, OnceLock};

use crate::identity;
use crate::models::{ApiSource, Paper, PaperBuilder, SearchQuery};
use crate::sources::{check_query, degrade, Source, SourceCapabilities, SourceError};
use crate::utils::HttpClient;

/// Default Crossref REST API base
pub const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Fields requested from the works endpoint
const SELECT_FIELDS: &str =
    "DOI,title,abstract,URL,published-print,issued,type,author,is-referenced-by-count";

/// Crossref research source
///
/// Single JSON call against the Works API; the citation count arrives with
/// each record so no secondary lookup is needed.
#[derive(Debug, Clone)]
pub struct CrossrefSource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl CrossrefSource {
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self::with_base_url(
            Arc::new(HttpClient::new()?),
            CROSSREF_API_BASE,
        ))
    }

    /// Create against a specific API base (mirrors, tests)
    pub fn with_base_url(client: Arc<HttpClient>, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn build_params(query: &SearchQuery) -> Vec<(String, String)> {
        let mut params = vec![
            ("query".to_string(), query.keywords.trim().to_string()),
            ("rows".to_string(), query.effective_max().to_string()),
            ("sort".to_string(), "relevance".to_string()),
            ("order".to_string(), "desc".to_string()),
            ("select".to_string(), SELECT_FIELDS.to_string()),
        ];

        if let Some((start, end)) = query.year_range() {
            params.push((
                "filter".to_string(),
                format!("from-pub-date:{},until-pub-date:{}", start, end),
            ));
        }
        params
    }

    async fn try_search(&self, query: &SearchQuery) -> Result<Vec<Paper>, SourceError> {
        let url = format!("{}/works", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&Self::build_params(query))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Api(format!(
                "Crossref API returned status: {}",
                response.status()
            )));
        }

        let body = response.text().await?;
        let mut papers = parse_works(&body)?;
        papers.truncate(query.effective_max());
        Ok(papers)
    }
}

#[async_trait]
impl Source for CrossrefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "Crossref"
    }

    fn api_source(&self) -> ApiSource {
        ApiSource::Crossref
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
                    "Crossref returned {} papers for '{}'",
                    papers.len(),
                    query.keywords
                );
                Ok(papers)
            }
            Err(e) => Ok(degrade(self.id(), query, e)),
        }
    }

    async fn fetch_details(&self, doi: &str) -> Option<Paper> {
        let url = format!("{}/works/{}", self.base_url, doi.trim());
        let response = match self.client.get(&url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Crossref lookup for {} failed: {}", doi, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(
                "Crossref lookup for {} returned status: {}",
                doi,
                response.status()
            );
            return None;
        }

        let body = response.text().await.ok()?;
        match serde_json::from_str::<CrossrefWork>(&body) {
            Ok(work) => Some(item_to_paper(work.message)),
            Err(e) => {
                tracing::warn!("Crossref record for {} is malformed: {}", doi, e);
                None
            }
        }
    }
}

/// Parse a works search response into papers
pub fn parse_works(json: &str) -> Result<Vec<Paper>, SourceError> {
    let data: CrossrefResponse = serde_json::from_str(json)?;
    Ok(data.message.items.into_iter().map(item_to_paper).collect())
}

fn item_to_paper(item: CrossrefItem) -> Paper {
    let doi = item.doi.unwrap_or_default();
    let title = item.title.into_iter().next().unwrap_or_default();

    let authors = item
        .author
        .into_iter()
        .filter_map(|a| a.display_name())
        .collect::<Vec<_>>();

    let year = item
        .published_print
        .as_ref()
        .and_then(CrossrefDate::year)
        .or_else(|| item.issued.as_ref().and_then(CrossrefDate::year));

    let id = identity::resolve_id(Some(doi.as_str()));
    tracing::info!("Crossref record: '{}' (DOI: {})", title, doi);

    let mut builder = PaperBuilder::new(id, title, ApiSource::Crossref)
        .authors(authors)
        .abstract_text(strip_markup(item.r#abstract.as_deref().unwrap_or_default()))
        .year(year)
        .doi(doi)
        .url(item.url.unwrap_or_default())
        .citation_count(item.is_referenced_by_count);

    if let Some(kind) = item.r#type {
        builder = builder.publication_type(kind);
    }
    builder.build()
}

/// Reduce JATS markup (`<jats:p>`, `<jats:title>`) to plain text
pub fn strip_markup(raw: &str) -> String {
    static TAGS: OnceLock<Option<Regex>> = OnceLock::new();
    let text = match TAGS.get_or_init(|| Regex::new(r"<[^>]+>").ok()) {
        Some(re) => re.replace_all(raw, " ").into_owned(),
        None => raw.to_string(),
    };
    crate::utils::xml::collapse_whitespace(&text)
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CrossrefResponse {
    message: CrossrefMessage,
}

#[derive(Debug, Deserialize)]
struct CrossrefWork {
    message: CrossrefItem,
}

#[derive(Debug, Default, Deserialize)]
struct CrossrefMessage {
    #[serde(default)]
    items: Vec<CrossrefItem>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefItem {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    title: Vec<String>,
    r#abstract: Option<String>,
    #[serde(rename = "URL")]
    url: Option<String>,
    #[serde(rename = "type")]
    r#type: Option<String>,
    author: Vec<CrossrefAuthor>,
    #[serde(rename = "published-print")]
    published_print: Option<CrossrefDate>,
    issued: Option<CrossrefDate>,
    #[serde(rename = "is-referenced-by-count")]
    is_referenced_by_count: u32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefAuthor {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

impl CrossrefAuthor {
    fn display_name(self) -> Option<String> {
        let joined = [self.given, self.family]
            .into_iter()
            .flatten()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !joined.is_empty() {
            return Some(joined);
        }
        self.name.filter(|n| !n.trim().is_empty())
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct CrossrefDate {
    #[serde(rename = "date-parts")]
    date_parts: Vec<Vec<Option<i32>>>,
}

impl CrossrefDate {
    fn year(&self) -> Option<i32> {
        self.date_parts.first()?.first().copied().flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "status": "ok",
        "message": {
            "total-results": 2,
            "items": [
                {
                    "DOI": "10.1038/nature14539",
                    "title": ["Deep learning"],
                    "abstract": "<jats:p>Deep learning allows <jats:italic>computational</jats:italic> models.</jats:p>",
                    "URL": "http://dx.doi.org/10.1038/nature14539",
                    "type": "journal-article",
                    "published-print": {"date-parts": [[2015, 5, 28]]},
                    "author": [
                        {"given": "Yann", "family": "LeCun"},
                        {"given": "Yoshua", "family": "Bengio"},
                        {"name": "Deep Learning Consortium"}
                    ],
                    "is-referenced-by-count": 52000
                },
                {
                    "issued": {"date-parts": [[null]]}
                }
            ]
        }
    }"#;

    #[test]
    fn test_parse_works() {
        let papers = parse_works(SAMPLE).unwrap();
        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.id, "10.1038nature14539");
        assert_eq!(first.title, "Deep learning");
        assert_eq!(first.r#abstract, "Deep learning allows computational models.");
        assert_eq!(first.year, Some(2015));
        assert_eq!(
            first.authors,
            vec!["Yann LeCun", "Yoshua Bengio", "Deep Learning Consortium"]
        );
        assert_eq!(first.citation_count, 52000);
        assert_eq!(first.publication_type.as_deref(), Some("journal-article"));
        assert_eq!(first.api_source, ApiSource::Crossref);
    }

    #[test]
    fn test_missing_fields_default() {
        let papers = parse_works(SAMPLE).unwrap();
        let bare = &papers[1];
        assert!(bare.title.is_empty());
        assert!(bare.doi.is_none());
        assert_eq!(bare.year, None);
        assert_eq!(bare.citation_count, 0);
        assert!(bare.id.starts_with("paper_"));
    }

    #[test]
    fn test_build_params_with_years() {
        let query = SearchQuery::new("graphene").years(2019, 2021).max_results(7);
        let params = CrossrefSource::build_params(&query);
        assert!(params.contains(&("rows".to_string(), "7".to_string())));
        assert!(params.contains(&(
            "filter".to_string(),
            "from-pub-date:2019,until-pub-date:2021".to_string()
        )));
    }

    #[tokio::test]
    async fn test_search_against_mock() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("query".into(), "deep learning".into()),
                mockito::Matcher::UrlEncoded("rows".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(SAMPLE)
            .create_async()
            .await;

        let client = Arc::new(HttpClient::with_user_agent("tests/1.0").unwrap());
        let source = CrossrefSource::with_base_url(client, server.url());
        let papers = source
            .search(&SearchQuery::new("deep learning").max_results(1))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(papers.len(), 1);
        assert_eq!(papers[0].doi.as_deref(), Some("10.1038/nature14539"));
    }

    #[tokio::test]
    async fn test_server_error_degrades_to_empty() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/works")
            .match_query(mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let client = Arc::new(HttpClient::with_user_agent("tests/1.0").unwrap());
        let source = CrossrefSource::with_base_url(client, server.url());
        let papers = source.search(&SearchQuery::new("anything")).await.unwrap();
        assert!(papers.is_empty());
    }

    #[tokio::test]
    async fn test_invalid_query_is_rejected() {
        let client = Arc::new(HttpClient::with_user_agent("tests/1.0").unwrap());
        let source = CrossrefSource::with_base_url(client, "http://127.0.0.1:9");
        let err = source
            .search(&SearchQuery::new("x").max_results(0))
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::InvalidRequest(_)));
    }
}
