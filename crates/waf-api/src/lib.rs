//! Typed bindings for the WAF Web ACL API.
//!
//! This crate models the subset of the WAF API needed to manage Web ACLs:
//! change-token acquisition, Web ACL create/get/update/delete, and the
//! error codes those calls can return.
//!
//! - [`types`]: request and response structures
//! - [`error`]: error codes and retry classification
//! - [`api`]: the [`WafApi`] trait implemented by backends
//! - [`memory`]: an in-process backend with real change-token semantics
//!
//! # Example
//!
//! ```
//! use waf_api::{MemoryWafApi, WafApi, CreateWebAclInput, WafAction};
//! use waf_types::{TokenScope, WafActionType};
//!
//! let api = MemoryWafApi::new(TokenScope::Global);
//! let token = api.get_change_token(&TokenScope::Global).unwrap();
//! let out = api
//!     .create_web_acl(CreateWebAclInput {
//!         change_token: token,
//!         name: "acl1".to_string(),
//!         metric_name: "acl1Metric".to_string(),
//!         default_action: WafAction::new(WafActionType::Allow),
//!     })
//!     .unwrap();
//! assert!(!out.web_acl.web_acl_id.is_empty());
//! ```

pub mod api;
pub mod error;
pub mod memory;
pub mod types;

pub use api::{ApiOperation, WafApi};
pub use error::{WafError, WafErrorCode, WafResult};
pub use memory::{ApiCall, MemorySnapshot, MemoryWafApi};
pub use types::{
    ActivatedRule, CreateWebAclInput, CreateWebAclOutput, DeleteWebAclInput, UpdateWebAclInput,
    WafAction, WafOverrideAction, WebAcl, WebAclUpdate,
};
