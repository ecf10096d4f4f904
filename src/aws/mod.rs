//! AWS implementations of the collaborator traits
//!
//! - `ecs`: `ClusterDirectory` over the ECS API
//! - `pricing`: `PricingCatalog` over the Price List API
//! - `helpers`: conversion from SDK shapes to crate types
//!
//! Every request goes through `ExponentialBackoffPolicy::for_cloud_api()`,
//! and every SDK failure through `sdk_error`, which decides whether that
//! policy gets to retry it.

mod ecs;
mod helpers;
mod pricing;

pub use ecs::EcsDirectory;
pub use pricing::AwsPricingCatalog;

use crate::error::{CompareError, ConfigError, Result};
use crate::region::Region;
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_ecs::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use tracing::{info, warn};

/// Service error codes that mean "slow down" or "try again", not "no"
const TRANSIENT_ERROR_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "ThrottledException",
    "TooManyRequestsException",
    "RequestLimitExceeded",
    "RequestThrottled",
    "RequestThrottledException",
    "ProvisionedThroughputExceededException",
    "ServiceUnavailable",
    "ServiceUnavailableException",
    "ServerException",
    "InternalError",
    "InternalFailure",
    "InternalServiceError",
    "InternalErrorException",
];

fn is_transient_code(code: Option<&str>) -> bool {
    code.is_some_and(|c| TRANSIENT_ERROR_CODES.contains(&c))
}

/// Convert an SDK failure into a `CompareError`
///
/// Timeouts, dispatch failures, unreadable responses and throttling codes
/// become the retryable `CloudProvider`. Anything else is a permanent `Aws`
/// error.
pub(crate) fn sdk_error<E, R>(
    context: impl std::fmt::Display,
    err: SdkError<E, R>,
) -> CompareError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let transient = match &err {
        SdkError::TimeoutError(_) | SdkError::DispatchFailure(_) | SdkError::ResponseError(_) => {
            true
        }
        SdkError::ServiceError(_) => is_transient_code(err.code()),
        _ => false,
    };
    let message = format!("{}: {}", context, DisplayErrorContext(&err));

    if transient {
        warn!("Transient AWS failure: {}", message);
        CompareError::CloudProvider {
            provider: "aws".to_string(),
            message,
            source: None,
        }
    } else {
        CompareError::Aws(message)
    }
}

/// Load the default credential chain, pinned to `region`
pub async fn load_sdk_config(region: Region) -> SdkConfig {
    aws_config::defaults(BehaviorVersion::latest())
        .region(aws_config::Region::new(region.code()))
        .load()
        .await
}

/// Fail fast if the credential chain can't authenticate
///
/// Runs before any ECS or pricing request so a bad profile never produces a
/// half-gathered run.
pub async fn verify_credentials(sdk_config: &SdkConfig) -> Result<String> {
    use aws_sdk_sts::Client as StsClient;

    let identity = StsClient::new(sdk_config)
        .get_caller_identity()
        .send()
        .await
        .map_err(|e| {
            ConfigError::Credentials(format!(
                "{}\n  Check AWS_PROFILE or run: aws sts get-caller-identity",
                e
            ))
        })?;

    let account = identity.account().unwrap_or("unknown").to_string();
    info!("Authenticated against AWS account {}", account);
    Ok(account)
}
