use thiserror::Error;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Analysis service error: {0}")]
    Service(#[from] ServiceError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    #[error("Transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Internal error: {message}")]
    Internal { message: String },
}

/// Case store errors
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database connection failed: {message}")]
    Connection { message: String },

    #[error("Migration failed: {message}")]
    Migration { message: String },

    #[error("Serialization failed: {message}")]
    Serialization { message: String },

    #[error("SQLx error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

/// Analysis service errors
#[derive(Debug, Error)]
pub enum ServiceError {
    /// HTTP 429 from the service, recognized by status code rather than by
    /// matching message substrings.
    #[error("Rate limited by analysis service: {message}")]
    RateLimited { message: String },

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Request timeout after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ServiceError {
    /// Message shown inline next to the control that triggered the call.
    ///
    /// Rate limiting gets specific cool-down guidance, connectivity failures
    /// get a generic "could not reach" message, and service-reported errors
    /// pass through as-is.
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::RateLimited { .. } => {
                "The analysis service is rate limiting requests. Wait a few minutes \
                 before retrying, or switch to a different API key."
                    .to_string()
            }
            ServiceError::Api { message, .. } if !message.trim().is_empty() => message.clone(),
            ServiceError::Api { status, .. } => {
                format!("The analysis service returned an error (HTTP {})", status)
            }
            ServiceError::InvalidResponse { .. } => {
                "The analysis service returned an unreadable response".to_string()
            }
            ServiceError::Timeout { .. } | ServiceError::Http(_) => {
                "Could not reach the analysis server".to_string()
            }
        }
    }

    /// True for the rate-limit condition specifically.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ServiceError::RateLimited { .. })
    }
}

/// Workflow precondition and guard errors.
///
/// These are detected before any service call or store mutation.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("An API key is required; set one with `key set` first")]
    MissingApiKey,

    #[error("Input text cannot be empty")]
    EmptyInput,

    #[error("Unknown stage index: {index}")]
    UnknownStage { index: i32 },

    #[error("Case not found: {case_id}")]
    CaseNotFound { case_id: String },

    #[error("Stage {index} is already running")]
    StageRunning { index: i32 },

    #[error("The final petition needs at least one completed stage with output")]
    NoCompletedStages,

    #[error("This case already has a final petition")]
    FinalAlreadyExists,
}

/// Import/export errors
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Invalid import format: {message}")]
    Format { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Result type alias for analysis service operations
pub type ServiceResult<T> = Result<T, ServiceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::Config {
            message: "missing base url".to_string(),
        };
        assert_eq!(err.to_string(), "Configuration error: missing base url");

        let err = AppError::Internal {
            message: "unexpected".to_string(),
        };
        assert_eq!(err.to_string(), "Internal error: unexpected");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Connection {
            message: "failed to connect".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Database connection failed: failed to connect"
        );

        let err = StoreError::Migration {
            message: "version mismatch".to_string(),
        };
        assert_eq!(err.to_string(), "Migration failed: version mismatch");
    }

    #[test]
    fn test_rate_limit_user_message_is_specific() {
        let err = ServiceError::RateLimited {
            message: "429 Too Many Requests".to_string(),
        };
        assert!(err.is_rate_limited());
        let msg = err.user_message();
        assert!(msg.contains("rate limiting"));
        assert!(msg.contains("different API key"));
    }

    #[test]
    fn test_generic_api_error_passes_message_through() {
        let err = ServiceError::Api {
            status: 500,
            message: "model overloaded".to_string(),
        };
        assert!(!err.is_rate_limited());
        assert_eq!(err.user_message(), "model overloaded");

        let err = ServiceError::Api {
            status: 500,
            message: "  ".to_string(),
        };
        assert_eq!(
            err.user_message(),
            "The analysis service returned an error (HTTP 500)"
        );
    }

    #[test]
    fn test_timeout_maps_to_connectivity_message() {
        let err = ServiceError::Timeout { timeout_ms: 5000 };
        assert_eq!(err.user_message(), "Could not reach the analysis server");
    }

    #[test]
    fn test_workflow_error_display() {
        assert_eq!(
            WorkflowError::MissingApiKey.to_string(),
            "An API key is required; set one with `key set` first"
        );
        assert_eq!(
            WorkflowError::CaseNotFound {
                case_id: "c-123".to_string()
            }
            .to_string(),
            "Case not found: c-123"
        );
        assert_eq!(
            WorkflowError::FinalAlreadyExists.to_string(),
            "This case already has a final petition"
        );
    }

    #[test]
    fn test_store_error_conversion_to_app_error() {
        let store_err = StoreError::Serialization {
            message: "unexpected end of input".to_string(),
        };
        let app_err: AppError = store_err.into();
        assert!(matches!(app_err, AppError::Store(_)));
    }

    #[test]
    fn test_service_error_conversion_to_app_error() {
        let service_err = ServiceError::Timeout { timeout_ms: 1000 };
        let app_err: AppError = service_err.into();
        assert!(matches!(app_err, AppError::Service(_)));
    }

    #[test]
    fn test_transfer_error_display() {
        let err = TransferError::Format {
            message: "expected a JSON array of cases".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Invalid import format: expected a JSON array of cases"
        );
    }
}
