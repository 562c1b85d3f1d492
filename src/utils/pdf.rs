//! PDF text extraction utilities.
//!
//! Acquired PDFs are turned into plain text before they are handed to the AI
//! summarizer. Extraction runs on the blocking pool since `pdf-extract` is
//! CPU bound.

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur during PDF extraction
#[derive(Debug, Error)]
pub enum PdfExtractError {
    #[error("Failed to extract text from PDF: {0}")]
    ExtractionFailed(String),

    #[error("File not found or not a valid PDF: {0}")]
    InvalidFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Extract text from a PDF file.
///
/// Returns the extracted text content, or an error if extraction fails.
/// Scanned PDFs without a text layer yield an empty string.
pub fn extract_text(path: &Path) -> Result<String, PdfExtractError> {
    if !path.is_file() {
        return Err(PdfExtractError::InvalidFile(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let bytes = std::fs::read(path)?;
    if !looks_like_pdf(&bytes) {
        return Err(PdfExtractError::InvalidFile(format!(
            "Missing PDF header: {}",
            path.display()
        )));
    }

    let text = pdf_extract::extract_text_from_mem(&bytes)
        .map_err(|e| PdfExtractError::ExtractionFailed(e.to_string()))?;

    if text.trim().is_empty() {
        tracing::debug!("Extracted empty text from PDF: {}", path.display());
    }
    Ok(text)
}

/// Extract text without blocking the async runtime
pub async fn extract_text_async(path: PathBuf) -> Result<String, PdfExtractError> {
    tokio::task::spawn_blocking(move || extract_text(&path))
        .await
        .map_err(|e| PdfExtractError::ExtractionFailed(e.to_string()))?
}

/// Check for the `%PDF` magic bytes
pub fn looks_like_pdf(bytes: &[u8]) -> bool {
    bytes.starts_with(b"%PDF")
}
