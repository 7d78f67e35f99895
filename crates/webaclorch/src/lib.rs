//! WAF Web ACL orchestrator.
//!
//! Reconciles a declared Web ACL (name, metric name, default action and
//! rule bindings) against the WAF API:
//!
//! - [`schema`]: validates the attribute bag and expands it into typed values
//! - [`translate`]: turns rule bindings into API updates and back
//! - [`WebAclOrch`]: create/read/update/delete sequencing under change tokens
//! - [`config_file`]: TOML configuration for the `webaclorch` CLI
//! - [`LocalBackend`]: file-backed WAF backend used by the CLI
//! - [`commands`]: the `webaclorch` subcommands
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use waf_api::MemoryWafApi;
//! use waf_orch_common::{Resource, ResourceData};
//! use waf_types::TokenScope;
//! use waf_webaclorch::WebAclOrch;
//!
//! let orch = WebAclOrch::new(MemoryWafApi::new(TokenScope::Global), TokenScope::Global);
//! let desired = serde_json::from_value(json!({
//!     "name": "acl1",
//!     "metric_name": "acl1Metric",
//!     "default_action": [{"type": "ALLOW"}],
//! }))
//! .unwrap();
//!
//! let mut d = ResourceData::new(desired);
//! orch.create(&mut d).unwrap();
//! assert!(d.id().is_some());
//! ```

pub mod commands;
pub mod config_file;
pub mod error;
pub mod local;
pub mod orch;
pub mod schema;
pub mod translate;

pub use config_file::WebAclOrchConfig;
pub use error::{Result, WebAclError};
pub use local::LocalBackend;
pub use orch::{WebAclOrch, WebAclOrchStats};
pub use schema::WebAclSpec;
pub use translate::{build_updates, RuleBinding, RuleKind};
