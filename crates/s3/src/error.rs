//! SDK error classification
//!
//! Every SDK failure is mapped onto one logstore error kind at the boundary so
//! callers can tell retryable transport failures from permanent ones.

use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};

use logstore_core::Error;

/// Service error codes that mean the addressed resource does not exist
const NOT_FOUND_CODES: &[&str] = &["NoSuchKey", "NoSuchBucket", "NotFound"];

/// Service error codes that mean the credentials were rejected
const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
];

/// Map an SDK error for `target` to a logstore error
///
/// `is_not_found` recognises the operation's modeled not-found variant; the
/// HTTP status and the error code are checked after it.
pub(crate) fn map_sdk_error<E>(
    err: SdkError<E>,
    target: &str,
    is_not_found: impl Fn(&E) -> bool,
) -> Error
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
{
    match &err {
        SdkError::ServiceError(service_err) => {
            let status = service_err.raw().status().as_u16();
            let code = service_err.err().code().unwrap_or_default();

            if is_not_found(service_err.err()) || status == 404 || NOT_FOUND_CODES.contains(&code)
            {
                Error::NotFound(target.to_string())
            } else if status == 401 || status == 403 || AUTH_CODES.contains(&code) {
                Error::Auth(format!("{target}: {}", DisplayErrorContext(&err)))
            } else {
                Error::Network(format!("{target}: {}", DisplayErrorContext(&err)))
            }
        }
        SdkError::ConstructionFailure(_) => {
            Error::Config(format!("{target}: {}", DisplayErrorContext(&err)))
        }
        _ => Error::Network(format!("{target}: {}", DisplayErrorContext(&err))),
    }
}
