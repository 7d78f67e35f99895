//! Request and response structures for the WAF Web ACL API.
//!
//! These mirror the shapes the WAF API accepts and returns. In particular
//! [`ActivatedRule`] carries its action and override action as two
//! independent optional fields, exactly as the API does; callers that want
//! the kind/payload pairing enforced build these from a stronger type.

use serde::{Deserialize, Serialize};
use waf_types::{ChangeAction, ChangeToken, WafActionType, WafOverrideActionType, WafRuleType};

/// Action wrapper (`{"type": "BLOCK"}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WafAction {
    #[serde(rename = "type")]
    pub action_type: WafActionType,
}

impl WafAction {
    pub fn new(action_type: WafActionType) -> Self {
        Self { action_type }
    }
}

/// Override action wrapper (`{"type": "NONE"}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WafOverrideAction {
    #[serde(rename = "type")]
    pub action_type: WafOverrideActionType,
}

impl WafOverrideAction {
    pub fn new(action_type: WafOverrideActionType) -> Self {
        Self { action_type }
    }
}

/// A rule as activated inside a Web ACL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ActivatedRule {
    /// Evaluation order; lower values are evaluated first.
    pub priority: i64,
    /// ID of the referenced rule, rate-based rule or rule group.
    pub rule_id: String,
    /// Kind of the referenced rule.
    #[serde(rename = "type")]
    pub rule_type: WafRuleType,
    /// Action for `REGULAR` and `RATE_BASED` rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<WafAction>,
    /// Override action for `GROUP` rules.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub override_action: Option<WafOverrideAction>,
}

/// One insert or delete of an activated rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebAclUpdate {
    pub action: ChangeAction,
    pub activated_rule: ActivatedRule,
}

/// A Web ACL as returned by the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebAcl {
    pub web_acl_id: String,
    pub name: String,
    pub metric_name: String,
    pub default_action: WafAction,
    #[serde(default)]
    pub rules: Vec<ActivatedRule>,
}

/// Input for `CreateWebACL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWebAclInput {
    pub change_token: ChangeToken,
    pub name: String,
    pub metric_name: String,
    pub default_action: WafAction,
}

/// Output of `CreateWebACL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateWebAclOutput {
    pub change_token: ChangeToken,
    pub web_acl: WebAcl,
}

/// Input for `UpdateWebACL`.
///
/// `default_action` is only sent when it changed; `updates` may be empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateWebAclInput {
    pub change_token: ChangeToken,
    pub web_acl_id: String,
    pub default_action: Option<WafAction>,
    pub updates: Vec<WebAclUpdate>,
}

/// Input for `DeleteWebACL`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteWebAclInput {
    pub change_token: ChangeToken,
    pub web_acl_id: String,
}
