use std::borrow::Cow;

use serde::Serialize;
use thiserror::Error;

/// Error type returned by [`DocumentStore`](crate::store::DocumentStore) backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying Redis command failed.
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// A stored document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Target document was not found when performing a mutation.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// Invalid input supplied to a query or write.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    #[error("{message}")]
    Other { message: Cow<'static, str> },
}

/// Service-level error returned by the aggregators and write workflows.
#[derive(Debug, Error)]
pub enum AgoraError {
    /// A user, product or other addressed entity does not exist.
    #[error("{entity} not found: {key}")]
    NotFound { entity: &'static str, key: String },

    /// Caller supplied arguments that cannot be honoured.
    #[error("invalid request: {message}")]
    InvalidRequest { message: String },

    /// Validation failed for one or more fields.
    #[error("validation failed")]
    Validation(#[from] ValidationError),

    /// Store read or write failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// The aggregation did not complete before the configured deadline.
    #[error("aggregation timed out after {millis}ms")]
    Timeout { millis: u64 },
}

impl AgoraError {
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }
}

/// Collection of validation issues encountered while preparing a write.
#[derive(Debug, Error)]
#[error("validation errors: {issues:?}")]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub fn new<I>(issues: I) -> Self
    where
        I: IntoIterator<Item = ValidationIssue>,
    {
        Self {
            issues: issues.into_iter().collect(),
        }
    }

    /// Convenience helper for constructing a single-field validation error.
    pub fn single(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new([ValidationIssue::new(field, code, message)])
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Detailed validation failure for a single field.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(field: impl Into<String>, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            code: code.into(),
            message: message.into(),
        }
    }
}

pub type AgoraResult<T> = Result<T, AgoraError>;

/// Failure surface of the profile aggregation.
///
/// Only a missing user is distinguished; every other cause is reported as a
/// generic server failure.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("User not found")]
    NotFound,

    #[error("Failed to fetch user profile")]
    Failed(#[source] AgoraError),
}

impl ProfileError {
    pub fn status(&self) -> u16 {
        match self {
            ProfileError::NotFound => 404,
            ProfileError::Failed(_) => 500,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: self.to_string(),
            status: self.status(),
        }
    }
}

impl From<AgoraError> for ProfileError {
    fn from(err: AgoraError) -> Self {
        match err {
            AgoraError::NotFound { entity: "user", .. } => ProfileError::NotFound,
            other => ProfileError::Failed(other),
        }
    }
}

/// Structured `{error, status}` body handed to the view layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub status: u16,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_user_maps_to_404() {
        let err = ProfileError::from(AgoraError::not_found("user", "ghost"));
        assert_eq!(
            err.to_response(),
            ErrorResponse {
                error: "User not found".to_string(),
                status: 404
            }
        );
    }

    #[test]
    fn other_failures_collapse_to_500() {
        let store = StoreError::Other {
            message: "connection reset".into(),
        };
        let err = ProfileError::from(AgoraError::from(store));
        assert_eq!(err.status(), 500);
        assert_eq!(err.to_string(), "Failed to fetch user profile");

        let missing_post = ProfileError::from(AgoraError::not_found("post", "p1"));
        assert_eq!(missing_post.status(), 500);
    }
}
