//! Deduplication of papers gathered from several sources.

use std::collections::HashSet;
use strsim::jaro_winkler;

use crate::models::Paper;

/// Title similarity above which two records may describe the same paper
const TITLE_SIMILARITY_THRESHOLD: f64 = 0.95;

/// Find duplicate papers based on identifier, DOI, and title similarity
///
/// Returns groups of paper indices that are duplicates of each other. The
/// first index of each group is the earliest occurrence.
pub fn find_duplicates(papers: &[Paper]) -> Vec<Vec<usize>> {
    let mut groups: Vec<Vec<usize>> = Vec::new();
    let mut processed: HashSet<usize> = HashSet::new();

    for i in 0..papers.len() {
        if processed.contains(&i) {
            continue;
        }

        let mut group = vec![i];
        for (j, paper_j) in papers.iter().enumerate().skip(i + 1) {
            if !processed.contains(&j) && are_duplicates(&papers[i], paper_j) {
                group.push(j);
                processed.insert(j);
            }
        }

        if group.len() > 1 {
            groups.push(group);
        }
        processed.insert(i);
    }

    groups
}

/// Check if two papers are likely duplicates
fn are_duplicates(a: &Paper, b: &Paper) -> bool {
    if a.id == b.id {
        return true;
    }

    // DOI match is the strongest signal
    if let (Some(doi_a), Some(doi_b)) = (&a.doi, &b.doi) {
        return doi_a.eq_ignore_ascii_case(doi_b);
    }

    let title_a = normalize_title(&a.title);
    let title_b = normalize_title(&b.title);
    if title_a.is_empty() || title_b.is_empty() {
        return false;
    }

    (title_a == title_b || jaro_winkler(&title_a, &title_b) >= TITLE_SIMILARITY_THRESHOLD)
        && authors_match(a, b)
}

/// Check if authors approximately match
fn authors_match(a: &Paper, b: &Paper) -> bool {
    let authors_a: HashSet<String> = a.authors.iter().map(|s| s.trim().to_lowercase()).collect();
    let authors_b: HashSet<String> = b.authors.iter().map(|s| s.trim().to_lowercase()).collect();

    // Assume a match if author info is missing on either side
    if authors_a.is_empty() || authors_b.is_empty() {
        return true;
    }

    authors_a.intersection(&authors_b).count() > 0
}

/// Normalize a title for comparison
fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Fold `other` into `kept`, filling gaps and keeping the larger citation count
fn merge_into(kept: &mut Paper, other: Paper) {
    kept.citation_count = kept.citation_count.max(other.citation_count);
    if !kept.has_abstract() && other.has_abstract() {
        kept.r#abstract = other.r#abstract;
    }
    if kept.doi.is_none() {
        kept.doi = other.doi;
    }
    if kept.pmid.is_none() {
        kept.pmid = other.pmid;
    }
    if kept.pmcid.is_none() {
        kept.pmcid = other.pmcid;
    }
    if kept.pdf_url.is_none() {
        kept.pdf_url = other.pdf_url;
    }
    if kept.year.is_none() {
        kept.year = other.year;
    }
}

/// Remove duplicate papers, keeping the first occurrence of each group
///
/// Information only present on a dropped duplicate is merged into the kept
/// record.
pub fn deduplicate_papers(papers: Vec<Paper>) -> Vec<Paper> {
    let groups = find_duplicates(&papers);
    if groups.is_empty() {
        return papers;
    }

    let mut slots: Vec<Option<Paper>> = papers.into_iter().map(Some).collect();
    for group in groups {
        let first = group[0];
        for idx in group.into_iter().skip(1) {
            if let Some(dup) = slots[idx].take() {
                if let Some(kept) = slots[first].as_mut() {
                    merge_into(kept, dup);
                }
            }
        }
    }

    let unique: Vec<Paper> = slots.into_iter().flatten().collect();
    tracing::debug!("Deduplicated to {} papers", unique.len());
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ApiSource, PaperBuilder};

    fn paper(id: &str, title: &str, source: ApiSource) -> Paper {
        PaperBuilder::new(id, title, source).build()
    }

    #[test]
    fn test_same_doi_across_sources() {
        let mut a = paper("a", "Deep learning", ApiSource::Crossref);
        a.doi = Some("10.1000/XYZ".to_string());
        a.citation_count = 3;
        let mut b = paper("b", "Deep learning for everyone", ApiSource::PubMed);
        b.doi = Some("10.1000/xyz".to_string());
        b.pmid = Some("42".to_string());
        b.citation_count = 10;

        let unique = deduplicate_papers(vec![a, b]);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].id, "a");
        assert_eq!(unique[0].citation_count, 10);
        assert_eq!(unique[0].pmid.as_deref(), Some("42"));
    }

    #[test]
    fn test_similar_titles_with_shared_author() {
        let mut a = paper("a", "CRISPR screening in human cells.", ApiSource::PubMed);
        a.authors = vec!["Jane Doe".to_string()];
        let mut b = paper("b", "CRISPR Screening in Human Cells", ApiSource::Pmc);
        b.authors = vec!["jane doe".to_string(), "Bob Roe".to_string()];
        b.r#abstract = "Abstract".to_string();

        let unique = deduplicate_papers(vec![a, b]);
        assert_eq!(unique.len(), 1);
        assert_eq!(unique[0].r#abstract, "Abstract");
    }

    #[test]
    fn test_merge_fills_every_missing_field() {
        let mut a = paper("a", "Malaria vaccine efficacy", ApiSource::PubMed);
        a.pmid = Some("7".to_string());
        let mut b = paper("b", "Malaria vaccine efficacy", ApiSource::Crossref);
        b.doi = Some("10.1/mv".to_string());
        b.pmcid = Some("PMC7".to_string());
        b.pdf_url = Some("https://example.org/mv.pdf".to_string());
        b.year = Some(2021);
        b.r#abstract = "Efficacy was 77%.".to_string();

        let unique = deduplicate_papers(vec![a, b]);
        assert_eq!(unique.len(), 1);
        let kept = &unique[0];
        assert_eq!(kept.id, "a");
        assert_eq!(kept.pmid.as_deref(), Some("7"));
        assert_eq!(kept.doi.as_deref(), Some("10.1/mv"));
        assert_eq!(kept.pmcid.as_deref(), Some("PMC7"));
        assert_eq!(kept.pdf_url.as_deref(), Some("https://example.org/mv.pdf"));
        assert_eq!(kept.year, Some(2021));
        assert_eq!(kept.r#abstract, "Efficacy was 77%.");
    }

    #[test]
    fn test_different_papers_kept() {
        let mut a = paper("a", "Protein folding", ApiSource::Crossref);
        a.doi = Some("10.1/a".to_string());
        let mut b = paper("b", "Protein folding", ApiSource::Crossref);
        b.doi = Some("10.1/b".to_string());
        let c = paper("c", "Something else entirely", ApiSource::PubMed);

        assert_eq!(deduplicate_papers(vec![a, b, c]).len(), 3);
    }

    #[test]
    fn test_same_id_collapses() {
        let a = paper("same", "One", ApiSource::Crossref);
        let b = paper("same", "Two", ApiSource::Crossref);
        let groups = find_duplicates(&[a, b]);
        assert_eq!(groups, vec![vec![0, 1]]);
    }
}
