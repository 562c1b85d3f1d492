//! Stable per-paper identifiers.
//!
//! A DOI maps to the same identifier every time it is seen, so the caller can
//! dedup on it and use it as an artifact filename. Records without a DOI get a
//! synthetic `paper_<unix seconds>_<token>` identifier that is unique but not
//! reproducible across fetches.

use std::time::{SystemTime, UNIX_EPOCH};

/// Maximum length of an identifier derived from a DOI
pub const MAX_ID_LEN: usize = 50;

/// Derive the identifier for a record with an optional DOI
pub fn resolve_id(doi: Option<&str>) -> String {
    doi.map(sanitize_identifier)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(synthetic_id)
}

/// Reduce arbitrary text to a filename-safe token
///
/// Keeps ASCII alphanumerics, spaces, dots and underscores, trims trailing
/// whitespace and truncates to [`MAX_ID_LEN`] characters.
pub fn sanitize_identifier(raw: &str) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_'))
        .take(MAX_ID_LEN)
        .collect();
    kept.trim().trim_start_matches('.').to_string()
}

/// Whether `id` can be used verbatim as a file stem
pub fn is_filename_safe(id: &str) -> bool {
    !id.is_empty()
        && id != "."
        && id != ".."
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '.' | '_'))
}

fn synthetic_id() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs();
    let token = uuid::Uuid::new_v4().simple().to_string();
    format!("paper_{}_{}", secs, &token[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doi_is_deterministic() {
        let a = resolve_id(Some("10.1038/nature14539"));
        let b = resolve_id(Some("10.1038/nature14539"));
        assert_eq!(a, b);
        assert_eq!(a, "10.1038nature14539");
        assert!(is_filename_safe(&a));
    }

    #[test]
    fn test_sanitize_strips_and_truncates() {
        assert_eq!(sanitize_identifier("10.1000/a:b<c>d e_f"), "10.1000abcd e_f");
        let long = "9".repeat(120);
        assert_eq!(sanitize_identifier(&long).len(), MAX_ID_LEN);
        assert_eq!(sanitize_identifier("abc   "), "abc");
    }

    #[test]
    fn test_missing_doi_gets_synthetic_id() {
        let a = resolve_id(None);
        let b = resolve_id(None);
        assert!(a.starts_with("paper_"));
        assert!(is_filename_safe(&a));
        assert_ne!(a, b);
    }

    #[test]
    fn test_unusable_doi_falls_back() {
        let id = resolve_id(Some("///"));
        assert!(id.starts_with("paper_"));
        let id = resolve_id(Some(""));
        assert!(id.starts_with("paper_"));
    }

    #[test]
    fn test_filename_safety() {
        assert!(!is_filename_safe(""));
        assert!(!is_filename_safe(".."));
        assert!(!is_filename_safe("a/b"));
        assert!(is_filename_safe("10.1000 x_y"));
    }
}
