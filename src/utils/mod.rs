//! Utility modules supporting the retrieval pipeline.
//!
//! - [`deduplicate_papers`]: Collapse records describing the same paper across sources
//! - [`HttpClient`]: HTTP client with a bounded redirect chain and timeouts
//! - [`extract_text`]: Extract text content from acquired PDF files
//! - [`xml`]: Element tree used by the E-utilities adapters
//! - [`papers_table`]: Terminal table rendering
//!
//! # Deduplication
//!
//! ```rust
//! use paper_harvest::utils::deduplicate_papers;
//! use paper_harvest::models::Paper;
//!
//! # fn example(papers: Vec<Paper>) {
//! let unique = deduplicate_papers(papers);
//! # }
//! ```

mod dedup;
mod display;
mod http;
mod pdf;
pub mod xml;

pub use dedup::{deduplicate_papers, find_duplicates};
pub use display::{papers_table, truncate_with_ellipsis};
pub use http::{HttpClient, HttpSettings, DEFAULT_USER_AGENT};
pub use pdf::{extract_text, extract_text_async, looks_like_pdf, PdfExtractError};
