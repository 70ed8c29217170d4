use thiserror::Error;

#[derive(Debug, Error)]
pub enum WayfarerError {
    // Budget errors
    #[error("Usage limit exceeded: reserving {requested} more call(s) would exceed the limit of {limit} ({used} used)")]
    BudgetExceeded { used: u64, requested: u64, limit: u64 },

    // Worker errors
    #[error("Worker {worker} failed: {detail}")]
    Worker { worker: String, detail: String },

    #[error("Worker {worker} returned invalid output: {detail}")]
    Validation { worker: String, detail: String },

    // Run errors
    #[error("Run state invariant violated: {0}")]
    InvariantViolation(String),

    #[error("Run cancelled")]
    Cancelled,

    // LLM errors
    #[error("LLM request failed: {0}")]
    LlmRequest(String),

    #[error("LLM streaming error: {0}")]
    LlmStream(String),

    // Config errors
    #[error("Config error: {0}")]
    Config(String),

    #[error("Config file not found: {0}")]
    ConfigNotFound(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // JSON errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl WayfarerError {
    pub fn worker(worker: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Worker {
            worker: worker.into(),
            detail: detail.into(),
        }
    }

    pub fn validation(worker: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Validation {
            worker: worker.into(),
            detail: detail.into(),
        }
    }

    /// Whether this error ends the whole run regardless of which stage hit it.
    pub fn is_run_fatal(&self) -> bool {
        matches!(self, Self::BudgetExceeded { .. } | Self::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, WayfarerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_message() {
        let err = WayfarerError::BudgetExceeded {
            used: 2,
            requested: 1,
            limit: 2,
        };
        assert_eq!(
            err.to_string(),
            "Usage limit exceeded: reserving 1 more call(s) would exceed the limit of 2 (2 used)"
        );
        assert!(err.is_run_fatal());
    }

    #[test]
    fn test_worker_errors_not_fatal() {
        assert!(!WayfarerError::worker("seat_selection", "timeout").is_run_fatal());
        assert!(!WayfarerError::validation("payment", "missing status").is_run_fatal());
    }
}
