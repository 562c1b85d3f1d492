//! AI summaries of acquired artifacts.
//!
//! The summarizer is an external collaborator: it takes a block of text and
//! returns a block of text. This module loads the artifact text for a paper
//! and turns every failure into a readable message, so callers can store the
//! result as the paper's AI notes either way.

mod chat;

pub use chat::{ChatSummarizer, ANALYSIS_PROMPT};

use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

use crate::acquisition::ArtifactStore;
use crate::models::Paper;
use crate::utils::{extract_text_async, PdfExtractError};

#[derive(Debug, Error)]
pub enum AiError {
    #[error("no API key configured (set ai.api_key or PAPER_HARVEST_AI__API_KEY)")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },

    #[error("API returned no content")]
    EmptyResponse,

    #[error("{0}")]
    Artifact(String),

    #[error(transparent)]
    Pdf(#[from] PdfExtractError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Turns paper text into an analysis
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn analyze(&self, text: &str) -> Result<String, AiError>;
}

/// Analyze the acquired artifact of `paper`
///
/// Looks for `<id>.pdf`, then `<id>.txt`, under the artifact store. Never
/// fails: problems come back as a message starting with "Analysis failed".
pub async fn analyze_artifact(
    summarizer: &dyn Summarizer,
    paper: &Paper,
    artifacts: &ArtifactStore,
) -> String {
    match try_analyze(summarizer, paper, artifacts).await {
        Ok(summary) => {
            tracing::info!(
                "Analyzed '{}' ({} chars of summary)",
                paper.title,
                summary.len()
            );
            summary
        }
        Err(e) => {
            tracing::error!("Analysis of '{}' failed: {}", paper.title, e);
            format!("Analysis failed: {}", e)
        }
    }
}

async fn try_analyze(
    summarizer: &dyn Summarizer,
    paper: &Paper,
    artifacts: &ArtifactStore,
) -> Result<String, AiError> {
    let path = artifacts.find_existing(&paper.id).ok_or_else(|| {
        AiError::Artifact(format!(
            "no artifact for {} under {}",
            paper.id,
            artifacts.root().display()
        ))
    })?;
    let text = load_text(&path).await?;
    if text.trim().is_empty() {
        return Err(AiError::Artifact(format!(
            "{} contains no text",
            path.display()
        )));
    }
    tracing::debug!("Loaded {} chars from {}", text.len(), path.display());
    summarizer.analyze(&text).await
}

/// Text content of an artifact: PDF text layer or the saved abstract
pub async fn load_text(path: &Path) -> Result<String, AiError> {
    let is_pdf = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
    if is_pdf {
        Ok(extract_text_async(path.to_path_buf()).await?)
    } else {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

/// Analyze every downloaded paper in turn
///
/// Papers not marked as downloaded, or whose artifact is missing, are skipped.
/// Returns `(paper id, analysis)` pairs in input order.
pub async fn analyze_batch(
    summarizer: &dyn Summarizer,
    papers: &[Paper],
    artifacts: &ArtifactStore,
) -> Vec<(String, String)> {
    let mut results = Vec::new();
    for (i, paper) in papers.iter().enumerate() {
        tracing::info!("Analyzing {}/{}: {}", i + 1, papers.len(), paper.title);
        if !paper.downloaded {
            tracing::warn!("Skipping '{}': not downloaded", paper.title);
            continue;
        }
        if artifacts.find_existing(&paper.id).is_none() {
            tracing::warn!("Skipping '{}': artifact file missing", paper.title);
            continue;
        }
        let analysis = analyze_artifact(summarizer, paper, artifacts).await;
        results.push((paper.id.clone(), analysis));
    }
    tracing::info!("Analyzed {} of {} papers", results.len(), papers.len());
    results
}
