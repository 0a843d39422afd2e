//! AWS SDK error classification
//!
//! Maps SDK errors onto [`ProviderError`] using the `.code()` reported by
//! the service rather than matching on Debug output.

use aws_sdk_rds::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use crate::provider::ProviderError;

/// Known RDS error codes for "not found" conditions
const NOT_FOUND_CODES: &[&str] = &[
    "DBClusterNotFoundFault",
    "DBInstanceNotFound",
    "DBInstanceNotFoundFault",
    "DBClusterSnapshotNotFoundFault",
    "DBSnapshotNotFound",
];

/// Known AWS error codes for throttling/rate limiting
const THROTTLING_CODES: &[&str] = &[
    "Throttling",
    "ThrottlingException",
    "RequestLimitExceeded",
    "TooManyRequestsException",
];

/// Classify a service error from its code and message
pub fn classify_code(code: Option<&str>, message: Option<&str>) -> ProviderError {
    let message = message.unwrap_or("Unknown error").to_string();

    match code {
        Some(c) if NOT_FOUND_CODES.contains(&c) => ProviderError::NotFound { message },
        Some(c) if THROTTLING_CODES.contains(&c) => ProviderError::Throttled { message },
        _ => ProviderError::Rejected {
            code: code.map(str::to_string),
            message,
        },
    }
}

/// Classify any RDS operation error
///
/// Dispatch failures and client-side timeouts never reached the service and
/// map to [`ProviderError::Connection`].
pub fn classify_sdk_error<E, R>(err: SdkError<E, R>) -> ProviderError
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug + 'static,
{
    match &err {
        SdkError::DispatchFailure(_) | SdkError::TimeoutError(_) => ProviderError::Connection {
            message: DisplayErrorContext(&err).to_string(),
        },
        SdkError::ServiceError(_) => classify_code(err.code(), err.message()),
        _ => {
            let message = DisplayErrorContext(&err).to_string();
            classify_code(err.code(), Some(&message))
        }
    }
}
