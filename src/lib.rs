//! # researchgap
//!
//! Research Literature Gap Analysis Pipeline
//!
//! Fetches a PubMed-format citation dump from S3-style object storage,
//! parses it into structured abstract records, clusters the records into
//! topics, and writes CSV exports plus interactive HTML visualizations.
//!
//! ## Modules
//!
//! - [`pipeline`] - Stage orchestration (fetch, parse, extract, export)
//! - [`object_store`] - S3-compatible object fetching with SigV4 signing
//! - [`parser`] - PubMed citation dump parsing
//! - [`topics`] - TF-IDF topic extraction and keyword scoring
//! - [`store`] - Run-scoped record store
//! - [`export`] - CSV exports
//! - [`viz`] - Self-contained HTML visualizations
//! - [`config`] - Pipeline configuration and credentials
//! - [`error`] - Custom error types
//!
//! ## Usage
//!
//! ```rust,no_run
//! use researchgap::config::PipelineConfig;
//! use researchgap::pipeline::Pipeline;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = PipelineConfig::new("my-bucket", "abstracts.txt");
//!     let summary = Pipeline::new(config)?.run().await;
//!     println!("Parsed {} records", summary.records_parsed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod export;
pub mod object_store;
pub mod parser;
pub mod pipeline;
pub mod store;
pub mod topics;
pub mod viz;

pub use error::{PipelineError, Result};
