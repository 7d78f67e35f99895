//! Error types for Web ACL orchestration.

use std::io;
use thiserror::Error;
use waf_orch_common::RetryError;

/// Result type alias for Web ACL operations.
pub type Result<T> = std::result::Result<T, WebAclError>;

/// Errors that can occur while reconciling a Web ACL.
#[derive(Debug, Error)]
pub enum WebAclError {
    /// The attribute bag does not describe a valid Web ACL.
    #[error("Invalid configuration for {field}: {message}")]
    InvalidConfig {
        /// The attribute that failed validation.
        field: String,
        /// Error message.
        message: String,
    },

    /// A WAF API call failed after retries, or with a fatal error.
    #[error("{context}: {source}")]
    Api {
        /// Lifecycle step that failed (e.g. "Error Updating WAF ACL").
        context: String,
        /// The underlying failure.
        #[source]
        source: RetryError,
    },

    /// The operation needs a Web ACL that has been created.
    #[error("Web ACL has no ID")]
    MissingId,

    /// Daemon configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A desired-attributes or resource document could not be read or written.
    #[error("{path}: {message}")]
    Document {
        /// The document path.
        path: String,
        /// Error message.
        message: String,
    },

    /// State document (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl WebAclError {
    /// Creates an invalid-configuration error.
    pub fn invalid_config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Creates a document error for `path`.
    pub fn document(path: &std::path::Path, message: impl std::fmt::Display) -> Self {
        Self::Document {
            path: path.display().to_string(),
            message: message.to_string(),
        }
    }

    /// Wraps an API failure with the lifecycle step it happened in.
    pub fn api(context: impl Into<String>, source: RetryError) -> Self {
        Self::Api {
            context: context.into(),
            source,
        }
    }

    /// Returns true if the remote object does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api { source, .. } if source.is_not_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use waf_api::WafError;

    #[test]
    fn test_api_error_display_carries_context() {
        let err = WebAclError::api(
            "Error Deleting WAF ACL",
            RetryError::Fatal {
                operation: "DeleteWebACL".to_string(),
                source: WafError::non_empty_entity("still has rules"),
            },
        );

        let msg = err.to_string();
        assert!(msg.starts_with("Error Deleting WAF ACL: "));
        assert!(msg.contains("still has rules"));
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_api_error_display_names_cause_once() {
        let err = WebAclError::api(
            "Error Updating WAF ACL",
            RetryError::Fatal {
                operation: "UpdateWebACL".to_string(),
                source: WafError::non_empty_entity("still has rules"),
            },
        );

        assert_eq!(err.to_string().matches("still has rules").count(), 1);
    }

    #[test]
    fn test_invalid_config_display() {
        let err = WebAclError::invalid_config("rules", "rule r1 requires an action");
        assert_eq!(
            err.to_string(),
            "Invalid configuration for rules: rule r1 requires an action"
        );
    }
}
