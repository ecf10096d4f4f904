//! Error types for fargate-compare
//!
//! There are two error types: `CompareError` (main error enum) and
//! `ConfigError` (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `CompareError`.
//! The binary uses `anyhow::Result<T>` for top-level error handling and maps
//! the underlying `CompareError` to an exit code (see `src/exit_codes.rs`).
//!
//! ## Retry Awareness
//!
//! Errors implement `IsRetryable` to indicate whether an operation should be
//! retried. `ExponentialBackoffPolicy` in `src/retry.rs` uses this to decide.
//! Only `CloudProvider`, `Io`, and `Retryable` are retryable.
//!
//! AWS failures are split when they are raised (see `aws::sdk_error`):
//! throttling, timeouts and dropped connections become `CloudProvider`,
//! everything else (access denied, bad parameters, missing clusters) becomes
//! `Aws` and fails on the first attempt.
//!
//! ## What is NOT an error
//!
//! A workload too large for any Fargate size and a resource the price list
//! has no entry for are data gaps, not failures. They are modelled as `None`
//! and end up as blank spreadsheet cells.

use thiserror::Error;

/// Main error type for fargate-compare
#[derive(Error, Debug)]
pub enum CompareError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Resource not found: {resource_type} - {resource_id}")]
    ResourceNotFound {
        resource_type: String,
        resource_id: String,
    },

    #[error("Retryable error (attempt {attempt}/{max_attempts}): {reason}")]
    Retryable {
        attempt: u32,
        max_attempts: u32,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Cloud provider error: {provider} - {message}")]
    CloudProvider {
        provider: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("AWS SDK error: {0}")]
    Aws(String),

    #[error("Price list error: {0}")]
    PriceList(String),

    #[error("Validation error: {field} - {reason}")]
    Validation { field: String, reason: String },

    #[error("Workbook error: {0}")]
    Workbook(String),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors
///
/// All of these are raised before the first cluster or pricing request.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Unsupported region: {0} (run 'fargate-compare regions' for the supported list)")]
    UnsupportedRegion(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("AWS credentials unavailable: {0}")]
    Credentials(String),

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CompareError>;

/// Trait for determining if an error is retryable
///
/// Used by `RetryPolicy` implementations to decide whether an error should
/// trigger another attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for CompareError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            CompareError::Retryable { .. }
                | CompareError::CloudProvider { .. }
                | CompareError::Io(_)
        )
    }
}
