//! oaiharvest-pmh - resumable OAI-PMH harvesting
//!
//! Drives a token-paginated `ListRecords` listing to completion, writing a
//! TSV metadata table and/or a raw-record stream with per-record
//! durability, and checkpointing the continuation state after every
//! committed record so an interrupted harvest resumes where it stopped.
//!
//! # Example
//!
//! ```ignore
//! use oaiharvest_pmh::{HarvestConfig, run};
//! use oaiharvest_core::ProgressContext;
//!
//! let config = HarvestConfig {
//!     endpoint: oaiharvest_pmh::DEFAULT_ENDPOINT.to_string(),
//!     metadata_prefix: "oai_dc".to_string(),
//!     set: None,
//!     checkpoint_path: "harvest.status".into(),
//!     metadata_output: Some("metadata.tsv.gz".into()),
//!     record_output: Some("records.xml.gz".into()),
//!     strip_xml: true,
//!     full_record: false,
//! };
//!
//! let summary = run(&config, &ProgressContext::new())?;
//! println!("harvested {} records", summary.written);
//! ```

pub mod checkpoint;
pub mod client;
pub mod config;
pub mod error;
pub mod parser;
pub mod runner;
pub mod token;
pub mod xml;

// Re-exports
pub use checkpoint::CheckpointStore;
pub use client::OaiClient;
pub use config::{DEFAULT_ENDPOINT, HarvestConfig};
pub use error::HarvestError;
pub use parser::{OaiRecord, RecordPage, SetInfo};
pub use runner::{Summary, run};
pub use token::ResumptionToken;
