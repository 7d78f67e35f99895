//! Common orchestration abstractions for WAF resources.
//!
//! This crate provides the pieces every WAF resource orchestrator needs:
//!
//! - [`WafRetryer`]: runs a mutation with a fresh change token, retrying
//!   when the token goes stale or the service throttles
//! - [`RetryPolicy`]: attempt budget and backoff parameters
//! - [`ChangeTokenSource`]: capability for issuing change tokens
//! - [`ResourceData`]: string-keyed attribute bag handed over by the
//!   declarative lifecycle runtime
//! - [`Resource`]: create/read/update/delete contract over that bag
//!
//! # Example
//!
//! ```
//! use waf_api::{MemoryWafApi, WafApi, DeleteWebAclInput};
//! use waf_orch_common::{RetryError, RetryPolicy, WafRetryer};
//! use waf_types::TokenScope;
//!
//! let api = MemoryWafApi::new(TokenScope::Global);
//! let retryer = WafRetryer::new(&api, TokenScope::Global)
//!     .with_policy(RetryPolicy::without_backoff(3));
//!
//! let result = retryer.retry_with_token("DeleteWebACL", |token| {
//!     api.delete_web_acl(DeleteWebAclInput {
//!         change_token: token.clone(),
//!         web_acl_id: "missing".to_string(),
//!     })
//! });
//! assert!(matches!(result, Err(RetryError::Fatal { .. })));
//! ```

mod resource;
mod retry;

pub use resource::{Attributes, Resource, ResourceData, ResourceState};
pub use retry::{ChangeTokenSource, RetryError, RetryPolicy, SleepFn, WafRetryer};
