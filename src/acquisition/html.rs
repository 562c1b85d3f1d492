//! Landing-page inspection with `scraper`.
//!
//! All functions take the page source and return owned results so no parsed
//! document is held across an await point.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::sync::OnceLock;
use url::Url;

use crate::utils::xml::collapse_whitespace;

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

/// Locate a PDF link on a publisher landing page
///
/// Checks, in order: the `citation_pdf_url` meta tag, the page URL itself,
/// any anchor whose href ends in `.pdf`, and any anchor labelled
/// "Download PDF".
pub fn find_pdf_link(html: &str, page_url: &Url) -> Option<Url> {
    if has_pdf_suffix(page_url.path()) {
        return Some(page_url.clone());
    }

    let document = Html::parse_document(html);

    let meta = selector(r#"meta[name="citation_pdf_url"]"#)?;
    if let Some(url) = document
        .select(&meta)
        .filter_map(|m| m.value().attr("content"))
        .find_map(|href| resolve(page_url, href))
    {
        return Some(url);
    }

    let anchors = selector("a[href]")?;
    let links: Vec<ElementRef<'_>> = document.select(&anchors).collect();

    let by_suffix = links.iter().find_map(|a| {
        let href = a.value().attr("href")?;
        let url = resolve(page_url, href)?;
        has_pdf_suffix(url.path()).then_some(url)
    });
    if by_suffix.is_some() {
        return by_suffix;
    }

    links.iter().find_map(|a| {
        let label = collapse_whitespace(&a.text().collect::<String>()).to_lowercase();
        if label.contains("download pdf") {
            resolve(page_url, a.value().attr("href")?)
        } else {
            None
        }
    })
}

/// Locate the embedded PDF on a mirror page
///
/// Mirrors serve the document in an `<embed type="application/pdf">`, behind
/// a download button (`onclick="location.href='...'"`), or in an iframe.
pub fn find_mirror_pdf(html: &str, page_url: &Url) -> Option<Url> {
    let document = Html::parse_document(html);

    let embed = selector(r#"embed[type="application/pdf"][src]"#)?;
    if let Some(url) = document
        .select(&embed)
        .filter_map(|e| e.value().attr("src"))
        .find_map(|src| resolve(page_url, src))
    {
        return Some(url);
    }

    let button = selector("button[onclick]")?;
    if let Some(url) = document
        .select(&button)
        .filter_map(|b| b.value().attr("onclick"))
        .filter_map(onclick_target)
        .find_map(|href| resolve(page_url, &href))
    {
        return Some(url);
    }

    let iframe = selector("iframe[src]")?;
    document
        .select(&iframe)
        .filter_map(|f| f.value().attr("src"))
        .find_map(|src| resolve(page_url, src))
}

/// Abstract text from a landing page: `<section class="abstract">` first,
/// then the description meta tag
pub fn extract_abstract(html: &str) -> Option<String> {
    let document = Html::parse_document(html);

    let section = selector("section.abstract")?;
    if let Some(text) = document
        .select(&section)
        .map(|s| collapse_whitespace(&s.text().collect::<Vec<_>>().join(" ")))
        .find(|t| !t.is_empty())
    {
        return Some(text);
    }

    let description = selector(r#"meta[name="description"]"#)?;
    document
        .select(&description)
        .filter_map(|m| m.value().attr("content"))
        .map(collapse_whitespace)
        .find(|t| !t.is_empty())
}

/// Target of `location.href='...'` in an onclick handler
fn onclick_target(onclick: &str) -> Option<String> {
    static HREF: OnceLock<Option<Regex>> = OnceLock::new();
    let re = HREF
        .get_or_init(|| Regex::new(r#"location\.href\s*=\s*['"]([^'"]+)['"]"#).ok())
        .as_ref()?;
    re.captures(onclick)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn resolve(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with("javascript:") || href.starts_with('#') {
        return None;
    }
    let url = base.join(href).ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn has_pdf_suffix(path: &str) -> bool {
    path.to_ascii_lowercase().ends_with(".pdf")
}
