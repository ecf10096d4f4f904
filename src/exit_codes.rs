//! Exit code standardization for fargate-compare
//!
//! ## Exit Code Convention
//!
//! - `0` = Success
//! - `1` = User error (invalid input, validation failure)
//! - `2` = System error (AWS API failure, network error, file output)
//! - `3` = Configuration error (unsupported region, credentials, config parse error)

use crate::error::CompareError;

/// Standard exit codes
pub mod codes {
    /// Success
    pub const SUCCESS: i32 = 0;
    /// User error (invalid input, validation failure)
    pub const USER_ERROR: i32 = 1;
    /// System error (AWS API failure, network error)
    pub const SYSTEM_ERROR: i32 = 2;
    /// Configuration error (unsupported region, missing credentials)
    pub const CONFIG_ERROR: i32 = 3;
}

/// Map a CompareError to an exit code
pub fn exit_code_for_error(error: &CompareError) -> i32 {
    use CompareError::*;
    match error {
        Config(_) => codes::CONFIG_ERROR,

        Validation { .. } => codes::USER_ERROR,
        ResourceNotFound { .. } => codes::USER_ERROR,

        Aws(_) => codes::SYSTEM_ERROR,
        CloudProvider { .. } => codes::SYSTEM_ERROR,
        PriceList(_) => codes::SYSTEM_ERROR,
        Io(_) => codes::SYSTEM_ERROR,
        Retryable { .. } => codes::SYSTEM_ERROR,
        Workbook(_) => codes::SYSTEM_ERROR,
        Json(_) => codes::SYSTEM_ERROR,
    }
}

/// Exit code for an error that reached `main`
///
/// Falls back to `SYSTEM_ERROR` when the chain holds no `CompareError`.
pub fn exit_code_for_anyhow(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<CompareError>()
        .map(exit_code_for_error)
        .unwrap_or(codes::SYSTEM_ERROR)
}
