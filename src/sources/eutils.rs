//! Shared plumbing for the NCBI E-utilities (esearch / efetch / elink).

use chrono::NaiveDate;
use serde::Deserialize;

use crate::models::SearchQuery;
use crate::sources::SourceError;
use crate::utils::HttpClient;

/// Default E-utilities base URL
pub const EUTILS_BASE: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";

/// Default base for PMC article pages and PDFs
pub const PMC_ARTICLE_BASE: &str = "https://www.ncbi.nlm.nih.gov/pmc";

/// The PDF location PMC serves for an article
pub fn pmc_pdf_url(article_base: &str, pmcid: &str) -> String {
    format!(
        "{}/articles/PMC{}/pdf/",
        article_base.trim_end_matches('/'),
        strip_pmc_prefix(pmcid)
    )
}

/// The landing page PMC serves for an article
pub fn pmc_article_url(article_base: &str, pmcid: &str) -> String {
    format!(
        "{}/articles/PMC{}/",
        article_base.trim_end_matches('/'),
        strip_pmc_prefix(pmcid)
    )
}

/// Clean PMCID (remove PMC prefix if present)
pub fn strip_pmc_prefix(pmcid: &str) -> &str {
    let trimmed = pmcid.trim();
    trimmed
        .strip_prefix("PMC")
        .or_else(|| trimmed.strip_prefix("pmc"))
        .unwrap_or(trimmed)
}

/// Build esearch parameters for a database
///
/// `extra_term` is appended to the keywords (PMC uses it for the open-access
/// filter). A year range becomes a `[PDAT]` clause; the recent mode replaces
/// it with a `mindate`/`maxdate` window and sorts by publication date.
pub fn esearch_params(
    db: &str,
    query: &SearchQuery,
    extra_term: Option<&str>,
    today: NaiveDate,
) -> Vec<(String, String)> {
    let mut term = query.keywords.trim().to_string();
    if let Some(extra) = extra_term {
        term = format!("{} AND {}", term, extra);
    }

    let mut params = vec![("db".to_string(), db.to_string())];
    let mut sort = "relevance";

    if let Some(window) = query.recent {
        let floor = window.date_floor(today);
        params.push(("datetype".to_string(), "pdat".to_string()));
        params.push(("mindate".to_string(), floor.format("%Y/%m/%d").to_string()));
        params.push(("maxdate".to_string(), today.format("%Y/%m/%d").to_string()));
        sort = "pub_date";
    } else if let Some((start, end)) = query.year_range() {
        term = format!("{} AND ({}[PDAT]:{}[PDAT])", term, start, end);
    }

    params.push(("term".to_string(), term));
    params.push(("retmax".to_string(), query.effective_max().to_string()));
    params.push(("sort".to_string(), sort.to_string()));
    params.push(("retmode".to_string(), "json".to_string()));
    params
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

/// Parse the record identifiers out of an esearch JSON response
pub fn parse_esearch_ids(json: &str) -> Result<Vec<String>, SourceError> {
    let data: ESearchResponse = serde_json::from_str(json)?;
    Ok(data.esearchresult.idlist)
}

/// Run an esearch call and return the identifier list
pub async fn esearch(
    client: &HttpClient,
    base: &str,
    params: &[(String, String)],
) -> Result<Vec<String>, SourceError> {
    let url = format!("{}/esearch.fcgi", base.trim_end_matches('/'));
    let response = client.get(&url).query(params).send().await?;

    if !response.status().is_success() {
        return Err(SourceError::Api(format!(
            "esearch returned status: {}",
            response.status()
        )));
    }

    let body = response.text().await?;
    parse_esearch_ids(&body)
}

/// Fetch one record as XML; `Ok(None)` on a non-success status
pub async fn efetch(
    client: &HttpClient,
    base: &str,
    db: &str,
    id: &str,
) -> Result<Option<String>, SourceError> {
    let url = format!("{}/efetch.fcgi", base.trim_end_matches('/'));
    let response = client
        .get(&url)
        .query(&[("db", db), ("id", id), ("retmode", "xml")])
        .send()
        .await?;

    if !response.status().is_success() {
        tracing::warn!(
            "efetch for {} record {} returned status: {}",
            db,
            id,
            response.status()
        );
        return Ok(None);
    }

    Ok(Some(response.text().await?))
}

#[derive(Debug, Deserialize)]
struct ELinkResponse {
    #[serde(default)]
    linksets: Vec<LinkSet>,
}

#[derive(Debug, Deserialize)]
struct LinkSet {
    #[serde(default)]
    linksetdbs: Vec<LinkSetDb>,
}

#[derive(Debug, Deserialize)]
struct LinkSetDb {
    #[serde(default)]
    linkname: String,
    #[serde(default)]
    links: Vec<serde_json::Value>,
}

/// Count the links of `linkname` in an elink JSON response
///
/// A response without a matching link set means zero links.
pub fn parse_elink_count(json: &str, linkname: &str) -> Result<u32, SourceError> {
    let data: ELinkResponse = serde_json::from_str(json)?;
    let count = data
        .linksets
        .iter()
        .flat_map(|set| set.linksetdbs.iter())
        .filter(|db| db.linkname == linkname)
        .map(|db| db.links.len())
        .sum::<usize>();
    Ok(u32::try_from(count).unwrap_or(u32::MAX))
}
