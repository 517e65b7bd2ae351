use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use super::types::{AnalyzeRequest, AnalyzeResponse, ErrorBody};
use crate::config::{RequestConfig, ServiceConfig};
use crate::error::{ServiceError, ServiceResult};

/// Client for the hosted analysis endpoint.
///
/// One call per stage invocation. Failed calls are never retried here; the
/// user re-invokes the stage.
#[derive(Clone)]
pub struct AnalysisClient {
    client: Client,
    base_url: String,
    timeout_ms: u64,
}

impl AnalysisClient {
    /// Create a new analysis client
    pub fn new(config: &ServiceConfig, request_config: &RequestConfig) -> ServiceResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(ServiceError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout_ms: request_config.timeout_ms,
        })
    }

    /// Run one analysis call.
    pub async fn analyze(&self, request: AnalyzeRequest) -> ServiceResult<AnalyzeResponse> {
        let url = format!("{}/api/analyze", self.base_url);
        let stage_index = request.stage_index;

        debug!(
            stage_index,
            text_chars = request.text.chars().count(),
            context_entries = request.previous_summaries.as_ref().map_or(0, Vec::len),
            "Calling analysis service"
        );

        let start = Instant::now();

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(stage_index, error = %e, "Analysis request failed to reach the service");
                if e.is_timeout() {
                    ServiceError::Timeout {
                        timeout_ms: self.timeout_ms,
                    }
                } else {
                    ServiceError::Http(e)
                }
            })?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            // The failure payload is `{ "error": "..." }`; fall back to the
            // raw body when it does not parse.
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .unwrap_or(body);

            error!(stage_index, status = status.as_u16(), "Analysis service returned an error");

            return Err(if status.as_u16() == 429 {
                ServiceError::RateLimited { message }
            } else {
                ServiceError::Api {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let analysis: AnalyzeResponse =
            response
                .json()
                .await
                .map_err(|e| ServiceError::InvalidResponse {
                    message: format!("Failed to parse response: {}", e),
                })?;

        info!(
            stage_index,
            latency_ms = start.elapsed().as_millis() as u64,
            "Analysis call succeeded"
        );

        Ok(analysis)
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}
