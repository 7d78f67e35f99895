//! Common WAF types for Web ACL orchestration.
//!
//! This crate provides type-safe representations of the primitives shared
//! by the WAF API bindings and the orchestrators built on top of them:
//!
//! - [`WafActionType`]: `ALLOW` / `BLOCK` / `COUNT` actions
//! - [`WafOverrideActionType`]: `NONE` / `COUNT` overrides for rule groups
//! - [`WafRuleType`]: `REGULAR` / `RATE_BASED` / `GROUP` rule kinds
//! - [`ChangeAction`]: `INSERT` / `DELETE` update direction
//! - [`ChangeToken`] and [`TokenScope`]: single-use mutation credentials
//! - [`MetricName`]: CloudWatch metric names accepted by WAF

mod action;
mod metric;
mod rule;
mod token;

pub use action::{ChangeAction, WafActionType, WafOverrideActionType};
pub use metric::MetricName;
pub use rule::WafRuleType;
pub use token::{ChangeToken, TokenScope};

/// Common error type for parsing failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("invalid WAF action type: {0} (expected ALLOW, BLOCK or COUNT)")]
    InvalidActionType(String),

    #[error("invalid WAF override action type: {0} (expected NONE or COUNT)")]
    InvalidOverrideActionType(String),

    #[error("invalid WAF rule type: {0} (expected REGULAR, RATE_BASED or GROUP)")]
    InvalidRuleType(String),

    #[error("invalid change action: {0} (expected INSERT or DELETE)")]
    InvalidChangeAction(String),

    #[error("invalid metric name: {0:?} (only alphanumeric characters allowed)")]
    InvalidMetricName(String),

    #[error("invalid token scope: {0}")]
    InvalidTokenScope(String),
}
