//! Core data models for papers, search requests and acquisition outcomes.

mod outcome;
mod paper;
mod search;

pub use outcome::Outcome;
pub use paper::{ApiSource, Paper, PaperBuilder, UnsupportedSource};
pub use search::{RecentWindow, SearchQuery, MAX_RESULTS_LIMIT};
