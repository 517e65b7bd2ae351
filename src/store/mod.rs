//! Case store: durable, local persistence for the API key and the case
//! collection.
//!
//! The store is a pure data-access layer. It knows nothing about the staged
//! workflow beyond CRUD and merge-by-id; the whole collection is persisted as
//! one value, so every scoped mutator is a read-whole/modify/write-whole
//! sequence. Same-process calls serialize through awaited futures; concurrent
//! writers from other processes are a known lost-update gap.

mod sqlite;

pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::StoreResult;

/// Number of leading whitespace-delimited tokens used when deriving a case
/// name from its first input.
const NAME_SNIPPET_WORDS: usize = 5;

/// One completed unit of analysis.
///
/// Created only by a successful analysis call; immutable afterwards except
/// for deletion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisStage {
    /// Unique identifier, assigned at creation.
    pub id: String,
    /// Which of the fixed stage definitions produced this record, or the
    /// final-petition sentinel.
    pub stage_index: i32,
    /// Display name snapshotted at creation, decoupled from the live catalog.
    pub stage_label: String,
    /// The text submitted for this stage.
    pub input: String,
    /// The text the analysis service returned.
    pub output: String,
    /// Set at creation, never mutated.
    pub created_at: DateTime<Utc>,
}

/// One question/answer exchange attached to a case, independent of the
/// staged analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Unique identifier, assigned at creation.
    pub id: String,
    /// The user's question, verbatim.
    pub question: String,
    /// The analysis service's answer.
    pub answer: String,
    /// Set at creation, never mutated.
    pub created_at: DateTime<Utc>,
}

/// The aggregate root a user works within.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Case {
    /// Unique identifier, assigned at creation.
    pub id: String,
    /// User-editable display label.
    pub name: String,
    /// Set once at creation.
    pub created_at: DateTime<Utc>,
    /// Insertion order is chronological completion order; later stages'
    /// prompts are built from earlier stages' outputs.
    pub stages: Vec<AnalysisStage>,
    /// Optional chat log; absent is equivalent to empty.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub chats: Vec<ChatMessage>,
}

impl AnalysisStage {
    /// Create a new stage record with a fresh id and timestamp.
    pub fn new(
        stage_index: i32,
        stage_label: impl Into<String>,
        input: impl Into<String>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            stage_index,
            stage_label: stage_label.into(),
            input: input.into(),
            output: output.into(),
            created_at: Utc::now(),
        }
    }
}

impl ChatMessage {
    /// Create a new chat record with a fresh id and timestamp.
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            question: question.into(),
            answer: answer.into(),
            created_at: Utc::now(),
        }
    }
}

impl Case {
    /// Create a new empty case.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            created_at: Utc::now(),
            stages: Vec::new(),
            chats: Vec::new(),
        }
    }

    /// Derive a display name from the first input text: the leading
    /// whitespace-delimited tokens, suffixed with an ellipsis.
    pub fn name_from_input(input: &str) -> String {
        let snippet = input
            .split_whitespace()
            .take(NAME_SNIPPET_WORDS)
            .collect::<Vec<_>>()
            .join(" ");
        format!("{}...", snippet)
    }

    /// The stage record at a given index, if any.
    pub fn stage_at(&self, stage_index: i32) -> Option<&AnalysisStage> {
        self.stages.iter().find(|s| s.stage_index == stage_index)
    }

    /// All non-empty stage outputs in completion order.
    pub fn recorded_outputs(&self) -> Vec<String> {
        self.stages
            .iter()
            .filter(|s| !s.output.trim().is_empty())
            .map(|s| s.output.clone())
            .collect()
    }
}

/// Persistence trait for the API key and the case collection.
///
/// Implementations provide the five primitive operations; the scoped
/// mutators are read-whole/modify/write-whole sequences built on top, so a
/// backend only has to implement the primitives. Injected rather than
/// ambient so tests can substitute a fake.
#[async_trait]
pub trait CaseStore: Send + Sync {
    // Primitive operations

    /// The stored API key, or empty string if never set.
    async fn load_api_key(&self) -> StoreResult<String>;
    /// Overwrite the stored key unconditionally.
    async fn save_api_key(&self, key: &str) -> StoreResult<()>;
    /// The full persisted collection, most-recently-created-first.
    async fn get_all_cases(&self) -> StoreResult<Vec<Case>>;
    /// Replace the entire persisted collection.
    async fn save_all_cases(&self, cases: &[Case]) -> StoreResult<()>;
    /// Delete the case collection entry; the API key is unaffected.
    async fn clear_all_cases(&self) -> StoreResult<()>;

    // Scoped mutators

    /// Prepend a case to the collection.
    async fn add_case(&self, case: &Case) -> StoreResult<()> {
        let mut cases = self.get_all_cases().await?;
        cases.insert(0, case.clone());
        self.save_all_cases(&cases).await
    }

    /// Replace the case with matching id; no-op if no match.
    async fn update_case(&self, updated: &Case) -> StoreResult<()> {
        let mut cases = self.get_all_cases().await?;
        for case in cases.iter_mut() {
            if case.id == updated.id {
                *case = updated.clone();
            }
        }
        self.save_all_cases(&cases).await
    }

    /// Remove the case with matching id; no-op if no match.
    async fn delete_case(&self, case_id: &str) -> StoreResult<()> {
        let mut cases = self.get_all_cases().await?;
        cases.retain(|c| c.id != case_id);
        self.save_all_cases(&cases).await
    }

    /// The case with matching id, if present.
    async fn get_case(&self, case_id: &str) -> StoreResult<Option<Case>> {
        Ok(self
            .get_all_cases()
            .await?
            .into_iter()
            .find(|c| c.id == case_id))
    }

    /// Append a stage to the case with matching id; no-op if no match.
    async fn add_stage_to_case(&self, case_id: &str, stage: &AnalysisStage) -> StoreResult<()> {
        let mut cases = self.get_all_cases().await?;
        let Some(case) = cases.iter_mut().find(|c| c.id == case_id) else {
            return Ok(());
        };
        case.stages.push(stage.clone());
        self.save_all_cases(&cases).await
    }

    /// Replace the stage with matching id inside a case; no-op if no match.
    async fn update_stage_in_case(&self, case_id: &str, stage: &AnalysisStage) -> StoreResult<()> {
        let mut cases = self.get_all_cases().await?;
        let Some(case) = cases.iter_mut().find(|c| c.id == case_id) else {
            return Ok(());
        };
        for existing in case.stages.iter_mut() {
            if existing.id == stage.id {
                *existing = stage.clone();
            }
        }
        self.save_all_cases(&cases).await
    }

    /// Remove a stage from a case; no-op if no match.
    async fn delete_stage_from_case(&self, case_id: &str, stage_id: &str) -> StoreResult<()> {
        let mut cases = self.get_all_cases().await?;
        let Some(case) = cases.iter_mut().find(|c| c.id == case_id) else {
            return Ok(());
        };
        case.stages.retain(|s| s.id != stage_id);
        self.save_all_cases(&cases).await
    }

    /// Append a chat exchange to a case; no-op if no match.
    async fn add_chat_to_case(&self, case_id: &str, chat: &ChatMessage) -> StoreResult<()> {
        let mut cases = self.get_all_cases().await?;
        let Some(case) = cases.iter_mut().find(|c| c.id == case_id) else {
            return Ok(());
        };
        case.chats.push(chat.clone());
        self.save_all_cases(&cases).await
    }
}
