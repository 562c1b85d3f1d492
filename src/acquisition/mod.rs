//! Artifact acquisition.
//!
//! Given a paper and the API it came from, [`Acquirer`] walks an ordered list
//! of [`Strategy`] values until one produces a file under the download
//! directory:
//!
//! - **Crossref**: resolve the DOI (at most 5 redirects, 30 s timeout), take a
//!   PDF linked from the landing page, else ask the configured mirror, else
//!   scrape the abstract. Always reports an [`Outcome`], `Error` included.
//! - **PubMed**: re-fetch the record, download its full-text link, else save
//!   the abstract. Nothing usable means no outcome.
//! - **PMC**: download the PMC PDF, else save the abstract.
//!
//! [`Outcome`]: crate::models::Outcome

mod acquirer;
mod artifacts;
pub mod html;
mod strategy;

pub use acquirer::Acquirer;
pub use artifacts::{ArtifactKind, ArtifactStore};
pub use strategy::{crossref_plan, full_text_plan, LandingPage, Strategy};

use thiserror::Error;

/// Why a single strategy failed
///
/// These stay inside the acquirer: they are folded into an error outcome or
/// an absent result.
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error("too many redirects: {0}")]
    RedirectLimit(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("not a PDF: {0}")]
    NotPdf(String),

    #[error("{0}")]
    NotFound(String),

    #[error("identifier is not filename-safe: {0}")]
    InvalidId(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for AcquireError {
    fn from(err: reqwest::Error) -> Self {
        let url = err
            .url()
            .map(|u| u.to_string())
            .unwrap_or_else(|| "request".to_string());
        if err.is_redirect() {
            AcquireError::RedirectLimit(url)
        } else if err.is_timeout() {
            AcquireError::Timeout(url)
        } else {
            AcquireError::Network(err.to_string())
        }
    }
}
