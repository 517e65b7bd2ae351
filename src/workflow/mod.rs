//! Stage orchestrator: the forward-progress workflow.
//!
//! Drives one stage of analysis at a time, assembles length-bounded context
//! from the prior stage outputs, calls the analysis service, and on success
//! commits a new stage record into the case store (creating the case on the
//! first stage). The terminal pseudo-stage synthesizes a final petition from
//! all prior outputs and is guarded to a single record per case.

mod context;

pub use context::{assemble_context, CONTEXT_CEILING_CHARS};

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AppResult, WorkflowError};
use crate::prompts::question_prompt;
use crate::service::{AnalysisClient, AnalyzeRequest};
use crate::stages::{stage_by_index, FINAL_STAGE_INDEX, FINAL_STAGE_LABEL};
use crate::store::{AnalysisStage, Case, CaseStore, ChatMessage};

/// Tagged per-stage state, keyed by stage index.
#[derive(Debug, Clone, PartialEq)]
pub enum StageState {
    /// Never run, or not yet run in this session.
    Idle,
    /// A call is in flight; re-invocation is refused.
    Running,
    /// The last invocation committed a stage record.
    Succeeded {
        /// Id of the committed record.
        stage_id: String,
    },
    /// The last invocation failed; the user may re-invoke.
    Failed {
        /// User-facing failure message.
        message: String,
    },
}

/// Parameters for one ordinary stage run.
#[derive(Debug, Clone)]
pub struct RunStageParams {
    /// Existing case to append to; `None` creates a case.
    pub case_id: Option<String>,
    /// Index into the fixed stage catalog.
    pub stage_index: i32,
    /// The text to analyze.
    pub input: String,
    /// Explicit name for a newly created case; derived from the input when
    /// absent.
    pub case_name: Option<String>,
    /// Per-invocation key override; the stored key is used when absent.
    pub api_key: Option<String>,
}

/// Result of a committed stage run.
#[derive(Debug, Clone)]
pub struct StageOutcome {
    /// The case the record was appended to (created if needed).
    pub case_id: String,
    /// The committed record.
    pub stage: AnalysisStage,
}

/// Drives the staged analysis workflow against the case store and the
/// analysis service.
pub struct StageOrchestrator {
    store: Arc<dyn CaseStore>,
    client: AnalysisClient,
    states: Mutex<HashMap<i32, StageState>>,
}

impl StageOrchestrator {
    /// Create a new orchestrator over an injected store and service client.
    pub fn new(store: Arc<dyn CaseStore>, client: AnalysisClient) -> Self {
        Self {
            store,
            client,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// Current state of a stage in this session.
    pub async fn state_of(&self, stage_index: i32) -> StageState {
        self.states
            .lock()
            .await
            .get(&stage_index)
            .cloned()
            .unwrap_or(StageState::Idle)
    }

    /// Run one ordinary stage.
    ///
    /// Preconditions (checked before any call or store write): known stage
    /// index, non-empty input, non-empty API key, and the target case exists
    /// when one is named. On service failure nothing is persisted and the
    /// stage is left `Failed`; there is no automatic retry.
    pub async fn run_stage(&self, params: RunStageParams) -> AppResult<StageOutcome> {
        let stage = stage_by_index(params.stage_index).ok_or(WorkflowError::UnknownStage {
            index: params.stage_index,
        })?;
        if params.input.trim().is_empty() {
            return Err(WorkflowError::EmptyInput.into());
        }
        let api_key = self.resolve_api_key(params.api_key.as_deref()).await?;

        let case = match &params.case_id {
            Some(id) => Some(self.store.get_case(id).await?.ok_or_else(|| {
                WorkflowError::CaseNotFound {
                    case_id: id.clone(),
                }
            })?),
            None => None,
        };

        self.begin(stage.index).await?;

        let previous = case
            .as_ref()
            .map(|c| assemble_context(&c.recorded_outputs(), CONTEXT_CEILING_CHARS))
            .unwrap_or_default();

        debug!(
            stage_index = stage.index,
            context_entries = previous.len(),
            "Running analysis stage"
        );

        let mut request = AnalyzeRequest::new(params.input.clone(), stage.index, api_key);
        if !previous.is_empty() {
            request = request.with_previous_summaries(previous);
        }

        let response = match self.client.analyze(request).await {
            Ok(r) => r,
            Err(e) => {
                self.finish(
                    stage.index,
                    StageState::Failed {
                        message: e.user_message(),
                    },
                )
                .await;
                return Err(e.into());
            }
        };

        let record = AnalysisStage::new(stage.index, stage.label, params.input.clone(), response.analysis);

        let committed = match case {
            Some(c) => self
                .store
                .add_stage_to_case(&c.id, &record)
                .await
                .map(|_| c.id),
            None => {
                let name = params
                    .case_name
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or_else(|| Case::name_from_input(&params.input));
                let mut new_case = Case::new(name);
                new_case.stages.push(record.clone());
                self.store.add_case(&new_case).await.map(|_| new_case.id)
            }
        };

        let case_id = match committed {
            Ok(id) => id,
            Err(e) => {
                self.finish(
                    stage.index,
                    StageState::Failed {
                        message: e.to_string(),
                    },
                )
                .await;
                return Err(e.into());
            }
        };

        self.finish(
            stage.index,
            StageState::Succeeded {
                stage_id: record.id.clone(),
            },
        )
        .await;

        info!(
            case_id = %case_id,
            stage_index = stage.index,
            stage_id = %record.id,
            "Stage committed"
        );

        Ok(StageOutcome {
            case_id,
            stage: record,
        })
    }

    /// Synthesize the final petition for a case.
    ///
    /// Collects every prior stage output as full (unbounded) context and
    /// persists the result under the reserved sentinel index. A case ends
    /// with exactly one final record: a second invocation is rejected.
    pub async fn run_final(
        &self,
        case_id: &str,
        api_key: Option<&str>,
    ) -> AppResult<StageOutcome> {
        let api_key = self.resolve_api_key(api_key).await?;
        let case =
            self.store
                .get_case(case_id)
                .await?
                .ok_or_else(|| WorkflowError::CaseNotFound {
                    case_id: case_id.to_string(),
                })?;

        // Check before append, not upsert.
        if case.stage_at(FINAL_STAGE_INDEX).is_some() {
            return Err(WorkflowError::FinalAlreadyExists.into());
        }

        let outputs: Vec<String> = case
            .stages
            .iter()
            .filter(|s| s.stage_index != FINAL_STAGE_INDEX && !s.output.trim().is_empty())
            .map(|s| s.output.clone())
            .collect();
        if outputs.is_empty() {
            return Err(WorkflowError::NoCompletedStages.into());
        }

        // The original case text is the first stage's input.
        let case_text = case
            .stages
            .first()
            .map(|s| s.input.clone())
            .unwrap_or_default();

        self.begin(FINAL_STAGE_INDEX).await?;

        let request = AnalyzeRequest::new(case_text.clone(), FINAL_STAGE_INDEX, api_key)
            .with_previous_summaries(outputs)
            .as_final_petition();

        let response = match self.client.analyze(request).await {
            Ok(r) => r,
            Err(e) => {
                self.finish(
                    FINAL_STAGE_INDEX,
                    StageState::Failed {
                        message: e.user_message(),
                    },
                )
                .await;
                return Err(e.into());
            }
        };

        let record =
            AnalysisStage::new(FINAL_STAGE_INDEX, FINAL_STAGE_LABEL, case_text, response.analysis);

        if let Err(e) = self.store.add_stage_to_case(&case.id, &record).await {
            self.finish(
                FINAL_STAGE_INDEX,
                StageState::Failed {
                    message: e.to_string(),
                },
            )
            .await;
            return Err(e.into());
        }

        self.finish(
            FINAL_STAGE_INDEX,
            StageState::Succeeded {
                stage_id: record.id.clone(),
            },
        )
        .await;

        info!(case_id = %case.id, stage_id = %record.id, "Final petition committed");

        Ok(StageOutcome {
            case_id: case.id,
            stage: record,
        })
    }

    /// Ask a free-form question against a case.
    ///
    /// The question rides the generic analyze contract as the request text,
    /// with the bounded stage outputs as context; the exchange is appended to
    /// the case's chat log.
    pub async fn ask(
        &self,
        case_id: &str,
        question: &str,
        api_key: Option<&str>,
    ) -> AppResult<ChatMessage> {
        if question.trim().is_empty() {
            return Err(WorkflowError::EmptyInput.into());
        }
        let api_key = self.resolve_api_key(api_key).await?;
        let case =
            self.store
                .get_case(case_id)
                .await?
                .ok_or_else(|| WorkflowError::CaseNotFound {
                    case_id: case_id.to_string(),
                })?;

        let previous = assemble_context(&case.recorded_outputs(), CONTEXT_CEILING_CHARS);

        let mut request = AnalyzeRequest::new(question_prompt(question), 0, api_key);
        if !previous.is_empty() {
            request = request.with_previous_summaries(previous);
        }

        let response = self.client.analyze(request).await?;

        let chat = ChatMessage::new(question, response.analysis);
        self.store.add_chat_to_case(&case.id, &chat).await?;

        info!(case_id = %case.id, chat_id = %chat.id, "Chat exchange committed");

        Ok(chat)
    }

    /// The key to use for a call: explicit override, else the stored key.
    async fn resolve_api_key(&self, over_ride: Option<&str>) -> AppResult<String> {
        let key = match over_ride {
            Some(k) => k.to_string(),
            None => self.store.load_api_key().await?,
        };
        if key.trim().is_empty() {
            return Err(WorkflowError::MissingApiKey.into());
        }
        Ok(key)
    }

    /// Mark a stage `Running`, refusing if it already is.
    async fn begin(&self, stage_index: i32) -> Result<(), WorkflowError> {
        let mut states = self.states.lock().await;
        if matches!(states.get(&stage_index), Some(StageState::Running)) {
            return Err(WorkflowError::StageRunning { index: stage_index });
        }
        states.insert(stage_index, StageState::Running);
        Ok(())
    }

    async fn finish(&self, stage_index: i32, state: StageState) {
        self.states.lock().await.insert(stage_index, state);
    }
}
