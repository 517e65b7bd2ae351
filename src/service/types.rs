use serde::{Deserialize, Serialize};

/// Ceiling on submitted case text, a rough token-budget stand-in. Longer
/// inputs are truncated with an ellipsis before the request is sent.
pub const MAX_INPUT_CHARS: usize = 4_000;

/// Request to the analysis endpoint.
///
/// Field names follow the service's wire contract (camelCase).
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub text: String,
    pub stage_index: i32,
    pub api_key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_summaries: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_petition: Option<bool>,
}

/// Successful response from the analysis endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeResponse {
    pub analysis: String,
}

/// Error payload the service returns on failure.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
}

impl AnalyzeRequest {
    /// Create a request for one stage, truncating oversized input.
    pub fn new(text: impl Into<String>, stage_index: i32, api_key: impl Into<String>) -> Self {
        Self {
            text: truncate_input(&text.into()),
            stage_index,
            api_key: api_key.into(),
            previous_summaries: None,
            final_petition: None,
        }
    }

    /// Attach prior stage outputs as context.
    pub fn with_previous_summaries(mut self, summaries: Vec<String>) -> Self {
        self.previous_summaries = Some(summaries);
        self
    }

    /// Mark this request as the terminal synthesis call.
    pub fn as_final_petition(mut self) -> Self {
        self.final_petition = Some(true);
        self
    }
}

/// Truncate text to [`MAX_INPUT_CHARS`], appending an ellipsis when cut.
pub fn truncate_input(text: &str) -> String {
    if text.chars().count() <= MAX_INPUT_CHARS {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(MAX_INPUT_CHARS).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_untouched() {
        assert_eq!(truncate_input("short text"), "short text");
    }

    #[test]
    fn test_long_input_truncated_with_ellipsis() {
        let long = "a".repeat(MAX_INPUT_CHARS + 100);
        let truncated = truncate_input(&long);
        assert_eq!(truncated.chars().count(), MAX_INPUT_CHARS + 3);
        assert!(truncated.ends_with("..."));
    }

    #[test]
    fn test_request_serializes_camel_case() {
        let request = AnalyzeRequest::new("text", 3, "key")
            .with_previous_summaries(vec!["prior".to_string()])
            .as_final_petition();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["stageIndex"], 3);
        assert_eq!(value["apiKey"], "key");
        assert_eq!(value["previousSummaries"][0], "prior");
        assert_eq!(value["finalPetition"], true);
    }

    #[test]
    fn test_optional_fields_omitted_when_unset() {
        let request = AnalyzeRequest::new("text", 0, "key");
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("previousSummaries").is_none());
        assert!(value.get("finalPetition").is_none());
    }
}
