use thiserror::Error;

use super::types::ErrorResponse;
use crate::error::ConfigError;
use crate::sources::retry::Transient;

const AUTH_CODES: &[&str] = &[
    "AccessDenied",
    "InvalidAccessKeyId",
    "SignatureDoesNotMatch",
    "ExpiredToken",
    "InvalidToken",
    "TokenRefreshRequired",
    "AuthorizationHeaderMalformed",
];

const TRANSIENT_CODES: &[&str] = &["SlowDown", "InternalError", "ServiceUnavailable", "RequestTimeout"];

/// S3 errors that can occur while listing or fetching state objects.
///
/// SECURITY: Error messages must NEVER contain secret keys or session tokens.
#[derive(Debug, Error)]
pub enum S3Error {
    /// Credentials missing, malformed or rejected
    #[error("access denied ({code}): {message}")]
    Auth {
        status: u16,
        code: String,
        message: String,
    },

    #[error("bucket not found: '{bucket}'")]
    BucketNotFound { bucket: String },

    #[error("object not found: '{key}'")]
    ObjectNotFound { key: String },

    #[error("object key '{key}' has '.' or '..' segments and cannot be requested")]
    UnaddressableKey { key: String },

    /// Any other error response
    #[error("S3 error ({status} {code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Network-level error (connection failed, timeout, etc.)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("invalid response from storage endpoint: {message}")]
    InvalidResponse { message: String },

    #[error("invalid endpoint '{endpoint}': {message}")]
    InvalidEndpoint { endpoint: String, message: String },

    #[error("request signing failed: {0}")]
    Signing(String),
}

impl S3Error {
    /// Classify a non-success response by status and S3 error code.
    pub fn from_response(status: u16, body: &str, bucket: &str, key: Option<&str>) -> Self {
        let parsed: ErrorResponse = quick_xml::de::from_str(body).unwrap_or_default();
        let code = parsed.code;
        let message = if parsed.message.is_empty() {
            format!("HTTP {status}")
        } else {
            parsed.message
        };

        match code.clone().as_str() {
            "NoSuchBucket" => S3Error::BucketNotFound {
                bucket: bucket.to_string(),
            },
            "NoSuchKey" => S3Error::ObjectNotFound {
                key: key.unwrap_or_default().to_string(),
            },
            c if AUTH_CODES.contains(&c) || status == 401 || status == 403 => S3Error::Auth {
                status,
                code: if code.is_empty() { status.to_string() } else { code },
                message,
            },
            _ if status == 404 && key.is_none() => S3Error::BucketNotFound {
                bucket: bucket.to_string(),
            },
            _ if status == 404 => S3Error::ObjectNotFound {
                key: key.unwrap_or_default().to_string(),
            },
            _ => S3Error::Api {
                status,
                code,
                message,
            },
        }
    }
}

impl Transient for S3Error {
    fn is_transient(&self) -> bool {
        match self {
            S3Error::Network(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            S3Error::Api { status, code, .. } => {
                *status >= 500 || *status == 429 || TRANSIENT_CODES.contains(&code.as_str())
            }
            _ => false,
        }
    }
}

impl From<S3Error> for ConfigError {
    fn from(err: S3Error) -> Self {
        match &err {
            S3Error::Auth { .. } | S3Error::Signing(_) => ConfigError::authentication(err.to_string()),
            S3Error::InvalidEndpoint { .. } | S3Error::UnaddressableKey { .. } => {
                ConfigError::configuration(err.to_string())
            }
            S3Error::BucketNotFound { .. }
            | S3Error::ObjectNotFound { .. }
            | S3Error::Api { .. }
            | S3Error::Network(_)
            | S3Error::InvalidResponse { .. } => ConfigError::connectivity(err.to_string()),
        }
    }
}
