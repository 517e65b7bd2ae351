//! # Legal Case Analysis Engine
//!
//! Drives a fixed twelve-stage legal-text analysis workflow against a hosted
//! analysis service and accumulates the results into *case* records persisted
//! in a local store.
//!
//! ## Architecture
//!
//! ```text
//! CLI → Stage Orchestrator → Analysis service (HTTP)
//!              ↓
//!         Case Store (SQLite key-value)
//! ```
//!
//! The orchestrator depends on the case store for reads and writes and on the
//! analysis service as an opaque collaborator; the store has no dependency on
//! the orchestrator. Each successful stage call appends an immutable
//! [`store::AnalysisStage`] record to the current case, and later stages feed
//! the accumulated outputs back as length-bounded context. The terminal
//! "final petition" pseudo-stage synthesizes all prior outputs into one
//! document and is guarded to a single record per case.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use legal_case_analysis::{Config, StageOrchestrator};
//! use legal_case_analysis::service::AnalysisClient;
//! use legal_case_analysis::store::SqliteStore;
//! use legal_case_analysis::workflow::RunStageParams;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let store = Arc::new(SqliteStore::new(&config.database).await?);
//!     let client = AnalysisClient::new(&config.service, &config.request)?;
//!     let orchestrator = StageOrchestrator::new(store, client);
//!     let outcome = orchestrator
//!         .run_stage(RunStageParams {
//!             case_id: None,
//!             stage_index: 0,
//!             input: "case text".into(),
//!             case_name: None,
//!             api_key: None,
//!         })
//!         .await?;
//!     println!("{}", outcome.stage.output);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

/// Configuration management.
pub mod config;
/// Error types and result aliases for the application.
pub mod error;
/// Prompt construction for the analysis service.
pub mod prompts;
/// HTTP client and wire types for the analysis service.
pub mod service;
/// The fixed catalog of analysis stages.
pub mod stages;
/// Case store: local persistence for the API key and case collection.
pub mod store;
/// Import/export of the case collection.
pub mod transfer;
/// The stage orchestrator workflow.
pub mod workflow;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use workflow::StageOrchestrator;
