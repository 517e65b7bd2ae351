//! HTTP client for the hosted analysis service.
//!
//! The service is an opaque collaborator: given case text, a stage index, and
//! the prior stage outputs, it returns an analysis string or an error. This
//! module never interprets the analysis content.

mod client;
mod types;

pub use client::AnalysisClient;
pub use types::{truncate_input, AnalyzeRequest, AnalyzeResponse, MAX_INPUT_CHARS};
