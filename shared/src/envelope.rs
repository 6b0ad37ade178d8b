//! The success/failure envelope every backend reply is normalized into.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status reported when no HTTP response was received at all.
pub const NO_RESPONSE_STATUS: u16 = 0;

/// Substituted whenever a failure carries no usable message.
pub const GENERIC_ERROR_MESSAGE: &str = "unexpected response format";

/// Reply of a backend call.
///
/// Exactly one variant is active. On the wire a failure is recognised by its
/// `error` field, a success by `status` plus an optional `message`/`data`.
/// Decoding into a concrete `T` doubles as the schema check for `data`: a
/// body whose payload does not match `T` is not a [`ResponseEnvelope::Success`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseEnvelope<T> {
    /// Business or transport failure.
    Failure {
        /// HTTP status, or [`NO_RESPONSE_STATUS`] when nothing came back.
        status: u16,
        /// Human readable reason, never empty after normalization.
        error: String,
    },
    /// Successful call.
    Success {
        /// HTTP status.
        status: u16,
        /// Backend message, usually `"ok"`.
        #[serde(default)]
        message: String,
        /// Payload, absent for calls that return nothing.
        #[serde(skip_serializing_if = "Option::is_none")]
        data: Option<T>,
    },
}

impl<T> ResponseEnvelope<T> {
    /// Build a success envelope.
    pub fn success(status: u16, message: impl Into<String>, data: Option<T>) -> Self {
        Self::Success {
            status,
            message: message.into(),
            data,
        }
    }

    /// Build a failure envelope; an empty message becomes
    /// [`GENERIC_ERROR_MESSAGE`].
    pub fn failure(status: u16, error: impl Into<String>) -> Self {
        let error = error.into();
        let error = if error.trim().is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            error
        };
        Self::Failure {
            status,
            error,
        }
    }

    /// Failure for a request that never got a response.
    pub fn no_response(error: impl Into<String>) -> Self {
        Self::failure(NO_RESPONSE_STATUS, error)
    }

    /// Status carried by either variant.
    pub fn status(&self) -> u16 {
        match self {
            Self::Failure {
                status, ..
            }
            | Self::Success {
                status, ..
            } => *status,
        }
    }

    /// Whether this is the success variant.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Failure message, if any.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Failure {
                error, ..
            } => Some(error),
            Self::Success { .. } => None,
        }
    }

    /// Payload of a success, if any.
    pub fn data(&self) -> Option<&T> {
        match self {
            Self::Success {
                data, ..
            } => data.as_ref(),
            Self::Failure { .. } => None,
        }
    }

    /// Re-apply the failure invariants to a decoded envelope.
    pub fn normalized(self) -> Self {
        match self {
            Self::Failure {
                status,
                error,
            } => Self::failure(status, error),
            success => success,
        }
    }

    /// Convert into a `Result`, keeping the optional payload.
    pub fn into_result(self) -> Result<Option<T>, ApiError> {
        match self {
            Self::Success {
                data, ..
            } => Ok(data),
            Self::Failure {
                status,
                error,
            } => Err(ApiError::new(status, error)),
        }
    }

    /// Transform the payload, keeping status and message.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ResponseEnvelope<U> {
        match self {
            Self::Success {
                status,
                message,
                data,
            } => ResponseEnvelope::Success {
                status,
                message,
                data: data.map(f),
            },
            Self::Failure {
                status,
                error,
            } => ResponseEnvelope::Failure {
                status,
                error,
            },
        }
    }
}

/// Error surfaced to consumers of the fetch layer.
///
/// Transport, protocol and application failures all collapse into this one
/// shape; [`ApiError::is_transport`] tells the first kind apart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{message}")]
pub struct ApiError {
    /// HTTP status, or [`NO_RESPONSE_STATUS`].
    pub status: u16,
    /// Human readable reason.
    pub message: String,
}

impl ApiError {
    /// Create an error, substituting [`GENERIC_ERROR_MESSAGE`] for an empty
    /// message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        let message = if message.trim().is_empty() {
            GENERIC_ERROR_MESSAGE.to_string()
        } else {
            message
        };
        Self {
            status,
            message,
        }
    }

    /// True when no response was received.
    pub fn is_transport(&self) -> bool {
        self.status == NO_RESPONSE_STATUS
    }
}

impl<T> From<ApiError> for ResponseEnvelope<T> {
    fn from(err: ApiError) -> Self {
        Self::failure(err.status, err.message)
    }
}
