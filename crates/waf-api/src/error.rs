//! WAF error codes and retry classification.
//!
//! This module converts the error codes returned by the WAF API into a Rust
//! error type and decides which of them are transient.

use std::fmt;
use thiserror::Error;

/// Error codes returned by the WAF API.
///
/// These correspond to the exception names of the WAF Classic API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WafErrorCode {
    /// The change token was already used or another change committed first.
    StaleData,
    /// The request rate for the account was exceeded.
    Throttling,
    /// An account or in-flight operation limit was exceeded.
    LimitsExceeded,
    /// The referenced Web ACL or rule does not exist.
    NonexistentItem,
    /// The Web ACL still contains rules.
    NonEmptyEntity,
    /// A request parameter is invalid.
    InvalidParameter,
    /// The operation is not allowed in the current state.
    InvalidOperation,
    /// The name is already in use or otherwise disallowed.
    DisallowedName,
    /// The caller is not permitted to perform the operation.
    AccessDenied,
    /// The service failed internally.
    InternalError,
}

impl WafErrorCode {
    /// Returns the exception name used by the WAF API.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StaleData => "WAFStaleDataException",
            Self::Throttling => "ThrottlingException",
            Self::LimitsExceeded => "WAFLimitsExceededException",
            Self::NonexistentItem => "WAFNonexistentItemException",
            Self::NonEmptyEntity => "WAFNonEmptyEntityException",
            Self::InvalidParameter => "WAFInvalidParameterException",
            Self::InvalidOperation => "WAFInvalidOperationException",
            Self::DisallowedName => "WAFDisallowedNameException",
            Self::AccessDenied => "AccessDeniedException",
            Self::InternalError => "WAFInternalErrorException",
        }
    }

    /// Returns true if a request failing with this code may succeed when
    /// reissued with a fresh change token.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::StaleData | Self::Throttling | Self::LimitsExceeded)
    }
}

impl fmt::Display for WafErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by a WAF API call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct WafError {
    /// Error code.
    pub code: WafErrorCode,
    /// Human-readable message from the service.
    pub message: String,
}

impl WafError {
    /// Creates an error with the given code and message.
    pub fn new(code: WafErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Creates a stale change token error.
    pub fn stale_data(message: impl Into<String>) -> Self {
        Self::new(WafErrorCode::StaleData, message)
    }

    /// Creates a throttling error.
    pub fn throttling(message: impl Into<String>) -> Self {
        Self::new(WafErrorCode::Throttling, message)
    }

    /// Creates a not found error.
    pub fn nonexistent_item(message: impl Into<String>) -> Self {
        Self::new(WafErrorCode::NonexistentItem, message)
    }

    /// Creates an invalid parameter error.
    pub fn invalid_parameter(message: impl Into<String>) -> Self {
        Self::new(WafErrorCode::InvalidParameter, message)
    }

    /// Creates a non-empty entity error.
    pub fn non_empty_entity(message: impl Into<String>) -> Self {
        Self::new(WafErrorCode::NonEmptyEntity, message)
    }

    /// Returns true if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }

    /// Returns true if the referenced item does not exist.
    pub fn is_not_found(&self) -> bool {
        self.code == WafErrorCode::NonexistentItem
    }
}

/// Result type for WAF operations.
pub type WafResult<T> = Result<T, WafError>;
