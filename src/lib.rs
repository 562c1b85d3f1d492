//! # Paper Harvest
//!
//! Search scholarly metadata APIs (Crossref, PubMed, PubMed Central), attach
//! citation counts, acquire a PDF or abstract per paper and keep everything
//! in a local library.
//!
//! ## Architecture
//!
//! - [`sources`]: one adapter per upstream API, normalizing responses into [`Paper`]
//! - [`identity`]: stable, filename-safe paper identifiers
//! - [`citations`]: concurrent cited-by lookups behind a TTL cache
//! - [`acquisition`]: ordered strategy chains that write `<id>.pdf` or `<id>.txt`
//! - [`store`]: SQLite library of papers, download state and notes
//! - [`ai`]: summaries of acquired artifacts
//! - [`pipeline`]: the components wired together
//! - [`config`]: layered configuration
//! - [`utils`]: HTTP client, deduplication, PDF text, XML and table helpers

pub mod acquisition;
pub mod ai;
pub mod citations;
pub mod config;
pub mod identity;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod store;
pub mod utils;

pub use models::{ApiSource, Outcome, Paper};
pub use pipeline::Pipeline;
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
