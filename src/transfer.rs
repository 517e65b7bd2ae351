//! Import/export of the case collection.
//!
//! A convenience layer atop the case store: export writes the full collection
//! as human-readable JSON (no checksum, no version field); import parses a
//! user-supplied document, rejects anything that is not an array of cases
//! before any store write, and merges by id with first-write-wins.

use std::path::Path;

use tracing::info;

use crate::error::{AppResult, TransferError};
use crate::store::{Case, CaseStore};

/// Outcome of an import merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    /// Cases added to the collection.
    pub imported: usize,
    /// Cases skipped because the id already existed locally.
    pub skipped: usize,
}

/// Serialize the full case collection as a human-readable document.
pub fn export_document(cases: &[Case]) -> Result<String, TransferError> {
    serde_json::to_string_pretty(cases).map_err(|e| TransferError::Format {
        message: format!("Could not serialize cases: {}", e),
    })
}

/// Parse an import document.
///
/// The document must be a JSON array of case-shaped records; anything else is
/// rejected up front so a failed import never touches persisted state.
pub fn parse_import(raw: &str) -> Result<Vec<Case>, TransferError> {
    let value: serde_json::Value =
        serde_json::from_str(raw).map_err(|e| TransferError::Format {
            message: format!("Not valid JSON: {}", e),
        })?;

    if !value.is_array() {
        return Err(TransferError::Format {
            message: "Expected a JSON array of cases".to_string(),
        });
    }

    serde_json::from_value(value).map_err(|e| TransferError::Format {
        message: format!("Not a list of cases: {}", e),
    })
}

/// Merge imported cases into the local collection.
///
/// Id-keyed, first-write-wins: an imported case whose id already exists
/// locally is skipped regardless of field differences. Local order is
/// preserved; new cases are appended.
pub fn merge_cases(local: &mut Vec<Case>, incoming: Vec<Case>) -> ImportSummary {
    let mut summary = ImportSummary {
        imported: 0,
        skipped: 0,
    };
    for case in incoming {
        if local.iter().any(|c| c.id == case.id) {
            summary.skipped += 1;
        } else {
            local.push(case);
            summary.imported += 1;
        }
    }
    summary
}

/// Export the persisted collection to a file.
pub async fn export_to_path(store: &dyn CaseStore, path: &Path) -> AppResult<()> {
    let cases = store.get_all_cases().await?;
    let document = export_document(&cases)?;
    std::fs::write(path, document).map_err(TransferError::Io)?;
    info!(path = %path.display(), cases = cases.len(), "Exported case collection");
    Ok(())
}

/// Import a file and merge it into the persisted collection.
pub async fn import_from_path(store: &dyn CaseStore, path: &Path) -> AppResult<ImportSummary> {
    let raw = std::fs::read_to_string(path).map_err(TransferError::Io)?;
    let incoming = parse_import(&raw)?;

    let mut cases = store.get_all_cases().await?;
    let summary = merge_cases(&mut cases, incoming);
    if summary.imported > 0 {
        store.save_all_cases(&cases).await?;
    }

    info!(
        path = %path.display(),
        imported = summary.imported,
        skipped = summary.skipped,
        "Imported case collection"
    );
    Ok(summary)
}
