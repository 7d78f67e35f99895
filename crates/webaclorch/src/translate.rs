//! Rule-binding translation between the declarative and API shapes.
//!
//! Forward: validated [`RuleBinding`]s become [`WebAclUpdate`]s carrying one
//! uniform [`ChangeAction`]. Reverse: the [`ActivatedRule`]s returned by the
//! API are flattened back into attribute values.

use serde_json::{json, Map, Value};
use waf_api::{ActivatedRule, WafAction, WafOverrideAction, WebAclUpdate};
use waf_types::{ChangeAction, WafActionType, WafOverrideActionType, WafRuleType};

use crate::schema::{ACTION, OVERRIDE_ACTION, PRIORITY, RULE_ID, TYPE};

/// Kind of a bound rule together with the payload that kind requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Regular { action: WafActionType },
    RateBased { action: WafActionType },
    Group { override_action: WafOverrideActionType },
}

impl RuleKind {
    /// Returns the API rule type for this kind.
    pub fn rule_type(&self) -> WafRuleType {
        match self {
            Self::Regular { .. } => WafRuleType::Regular,
            Self::RateBased { .. } => WafRuleType::RateBased,
            Self::Group { .. } => WafRuleType::Group,
        }
    }
}

/// A rule attached to a Web ACL at a priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBinding {
    pub rule_id: String,
    pub priority: i64,
    pub kind: RuleKind,
}

impl RuleBinding {
    pub fn new(rule_id: impl Into<String>, priority: i64, kind: RuleKind) -> Self {
        Self {
            rule_id: rule_id.into(),
            priority,
            kind,
        }
    }

    /// Converts the binding to its API representation.
    pub fn to_activated_rule(&self) -> ActivatedRule {
        let (action, override_action) = match self.kind {
            RuleKind::Group { override_action } => {
                (None, Some(WafOverrideAction::new(override_action)))
            }
            RuleKind::Regular { action } | RuleKind::RateBased { action } => {
                (Some(WafAction::new(action)), None)
            }
        };

        ActivatedRule {
            priority: self.priority,
            rule_id: self.rule_id.clone(),
            rule_type: self.kind.rule_type(),
            action,
            override_action,
        }
    }
}

/// Builds one update per binding, all with the same change action.
pub fn build_updates(bindings: &[RuleBinding], change: ChangeAction) -> Vec<WebAclUpdate> {
    bindings
        .iter()
        .map(|binding| WebAclUpdate {
            action: change,
            activated_rule: binding.to_activated_rule(),
        })
        .collect()
}

/// Flattens a default action into its single-element list form.
pub fn flatten_default_action(action: &WafAction) -> Value {
    json!([{ TYPE: action.action_type.as_str() }])
}

/// Flattens activated rules into attribute maps, ordered by priority.
pub fn flatten_rules(rules: &[ActivatedRule]) -> Value {
    let mut sorted: Vec<&ActivatedRule> = rules.iter().collect();
    sorted.sort_by(|a, b| {
        a.priority
            .cmp(&b.priority)
            .then_with(|| a.rule_id.cmp(&b.rule_id))
    });

    Value::Array(sorted.into_iter().map(flatten_rule).collect())
}

fn flatten_rule(rule: &ActivatedRule) -> Value {
    let mut m = Map::new();
    m.insert(RULE_ID.to_string(), json!(rule.rule_id));
    m.insert(PRIORITY.to_string(), json!(rule.priority));
    m.insert(TYPE.to_string(), json!(rule.rule_type.as_str()));
    if let Some(action) = &rule.action {
        m.insert(
            ACTION.to_string(),
            json!([{ TYPE: action.action_type.as_str() }]),
        );
    }
    if let Some(override_action) = &rule.override_action {
        m.insert(
            OVERRIDE_ACTION.to_string(),
            json!([{ TYPE: override_action.action_type.as_str() }]),
        );
    }
    Value::Object(m)
}
