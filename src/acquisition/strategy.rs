//! Ordered acquisition strategies.

use url::Url;

/// A fetched DOI landing page
#[derive(Debug, Clone)]
pub struct LandingPage {
    /// URL after following redirects
    pub final_url: Url,
    pub content_type: String,
    pub body: Vec<u8>,
}

impl LandingPage {
    /// The resolver sometimes lands directly on the PDF
    pub fn is_pdf(&self) -> bool {
        crate::utils::looks_like_pdf(&self.body)
    }

    pub fn html(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One way of obtaining an artifact, tried in order until one succeeds
#[derive(Debug, Clone, Copy)]
pub enum Strategy<'a> {
    /// Save the landing page itself if it is a PDF, else follow a PDF link on it
    PagePdfLink(&'a LandingPage),

    /// Look the DOI up on the configured mirror
    Mirror { base: &'a str, doi: &'a str },

    /// Scrape the abstract from the landing page
    PageAbstract(&'a LandingPage),

    /// Download a known full-text link
    FullTextLink(&'a str),

    /// Save abstract text already in hand
    AbstractText(&'a str),
}

impl Strategy<'_> {
    /// Short label used in logs and aggregated failure messages
    pub fn label(&self) -> &'static str {
        match self {
            Strategy::PagePdfLink(_) => "pdf link",
            Strategy::Mirror { .. } => "mirror",
            Strategy::PageAbstract(_) => "page abstract",
            Strategy::FullTextLink(_) => "full-text link",
            Strategy::AbstractText(_) => "abstract",
        }
    }
}

/// Crossref order: PDF on the landing page, mirror, scraped abstract
///
/// Without a landing page only the mirror remains.
pub fn crossref_plan<'a>(
    page: Option<&'a LandingPage>,
    doi: &'a str,
    mirror: Option<&'a str>,
) -> Vec<Strategy<'a>> {
    let mut plan = Vec::new();
    if let Some(page) = page {
        plan.push(Strategy::PagePdfLink(page));
    }
    if let Some(base) = mirror {
        plan.push(Strategy::Mirror { base, doi });
    }
    if let Some(page) = page {
        plan.push(Strategy::PageAbstract(page));
    }
    plan
}

/// PubMed and PMC order: full-text link, then the abstract
pub fn full_text_plan<'a>(link: Option<&'a str>, abstract_text: &'a str) -> Vec<Strategy<'a>> {
    let mut plan = Vec::new();
    if let Some(link) = link.filter(|l| !l.trim().is_empty()) {
        plan.push(Strategy::FullTextLink(link));
    }
    if !abstract_text.trim().is_empty() {
        plan.push(Strategy::AbstractText(abstract_text));
    }
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page() -> LandingPage {
        LandingPage {
            final_url: Url::parse("https://publisher.example/a").unwrap(),
            content_type: "text/html".to_string(),
            body: b"<html></html>".to_vec(),
        }
    }

    fn labels(plan: &[Strategy<'_>]) -> Vec<&'static str> {
        plan.iter().map(Strategy::label).collect()
    }

    #[test]
    fn test_crossref_order() {
        let page = page();
        let plan = crossref_plan(Some(&page), "10.1/x", Some("https://mirror.example"));
        assert_eq!(labels(&plan), vec!["pdf link", "mirror", "page abstract"]);

        let plan = crossref_plan(Some(&page), "10.1/x", None);
        assert_eq!(labels(&plan), vec!["pdf link", "page abstract"]);

        let plan = crossref_plan(None, "10.1/x", Some("https://mirror.example"));
        assert_eq!(labels(&plan), vec!["mirror"]);
    }

    #[test]
    fn test_full_text_plan() {
        assert_eq!(
            labels(&full_text_plan(Some("https://x/pdf/"), "Text")),
            vec!["full-text link", "abstract"]
        );
        assert_eq!(labels(&full_text_plan(None, "Text")), vec!["abstract"]);
        assert!(full_text_plan(Some(" "), "  ").is_empty());
    }

    #[test]
    fn test_landing_page_pdf_detection() {
        let mut landing = page();
        assert!(!landing.is_pdf());
        landing.body = b"%PDF-1.5".to_vec();
        assert!(landing.is_pdf());
    }
}
