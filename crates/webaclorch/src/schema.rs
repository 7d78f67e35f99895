//! Attribute schema for the Web ACL resource.
//!
//! The resource is described by a flat attribute bag:
//!
//! ```json
//! {
//!   "name": "acl1",
//!   "metric_name": "acl1Metric",
//!   "default_action": [{"type": "ALLOW"}],
//!   "rules": [
//!     {"rule_id": "r1", "priority": 1, "type": "REGULAR", "action": [{"type": "BLOCK"}]}
//!   ]
//! }
//! ```
//!
//! Expansion validates the structural constraints (metric name pattern,
//! enum membership, a single default action, one payload per rule) and
//! produces typed values.

use serde_json::Value;
use waf_orch_common::Attributes;
use waf_types::{MetricName, WafActionType, WafOverrideActionType, WafRuleType};

use crate::error::{Result, WebAclError};
use crate::translate::{RuleBinding, RuleKind};

pub const NAME: &str = "name";
pub const METRIC_NAME: &str = "metric_name";
pub const DEFAULT_ACTION: &str = "default_action";
pub const RULES: &str = "rules";

pub const RULE_ID: &str = "rule_id";
pub const PRIORITY: &str = "priority";
pub const TYPE: &str = "type";
pub const ACTION: &str = "action";
pub const OVERRIDE_ACTION: &str = "override_action";

/// Fully expanded Web ACL attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAclSpec {
    pub name: String,
    pub metric_name: MetricName,
    pub default_action: WafActionType,
    pub rules: Vec<RuleBinding>,
}

/// Validates and expands the whole attribute bag.
pub fn expand(attrs: &Attributes) -> Result<WebAclSpec> {
    Ok(WebAclSpec {
        name: expand_name(attrs)?,
        metric_name: expand_metric_name(attrs)?,
        default_action: expand_default_action(attrs)?,
        rules: expand_rules(attrs)?,
    })
}

pub fn expand_name(attrs: &Attributes) -> Result<String> {
    match required_str(attrs, NAME)? {
        "" => Err(WebAclError::invalid_config(NAME, "must not be empty")),
        name => Ok(name.to_string()),
    }
}

pub fn expand_metric_name(attrs: &Attributes) -> Result<MetricName> {
    MetricName::new(required_str(attrs, METRIC_NAME)?)
        .map_err(|e| WebAclError::invalid_config(METRIC_NAME, e.to_string()))
}

/// Expands the default action; exactly one must be given.
pub fn expand_default_action(attrs: &Attributes) -> Result<WafActionType> {
    let value = lookup(attrs, DEFAULT_ACTION)
        .ok_or_else(|| WebAclError::invalid_config(DEFAULT_ACTION, "is required"))?;

    match payload_type(DEFAULT_ACTION, value)? {
        Some(t) => t
            .parse::<WafActionType>()
            .map_err(|e| WebAclError::invalid_config(DEFAULT_ACTION, e.to_string())),
        None => Err(WebAclError::invalid_config(
            DEFAULT_ACTION,
            "exactly one default action is required",
        )),
    }
}

/// Expands the rule list. A missing or null `rules` attribute means no rules.
pub fn expand_rules(attrs: &Attributes) -> Result<Vec<RuleBinding>> {
    let items = match lookup(attrs, RULES) {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(_) => return Err(WebAclError::invalid_config(RULES, "must be a list")),
    };

    items
        .iter()
        .enumerate()
        .map(|(index, item)| expand_rule(index, item))
        .collect()
}

fn expand_rule(index: usize, item: &Value) -> Result<RuleBinding> {
    let rule = item
        .as_object()
        .ok_or_else(|| rule_error(&format!("#{}", index), "must be an object"))?;

    let rule_id = match rule.get(RULE_ID).and_then(Value::as_str) {
        Some(id) if !id.is_empty() => id,
        _ => return Err(rule_error(&format!("#{}", index), "rule_id is required")),
    };

    let priority = rule
        .get(PRIORITY)
        .and_then(Value::as_i64)
        .ok_or_else(|| rule_error(rule_id, "priority must be an integer"))?;

    let rule_type = match rule.get(TYPE) {
        None | Some(Value::Null) => WafRuleType::default(),
        Some(Value::String(s)) => s
            .parse::<WafRuleType>()
            .map_err(|e| rule_error(rule_id, &e.to_string()))?,
        Some(_) => return Err(rule_error(rule_id, "type must be a string")),
    };

    let action = match rule.get(ACTION) {
        Some(v) if !v.is_null() => payload_type(RULES, v)?,
        _ => None,
    };
    let override_action = match rule.get(OVERRIDE_ACTION) {
        Some(v) if !v.is_null() => payload_type(RULES, v)?,
        _ => None,
    };

    let kind = if rule_type.uses_override_action() {
        if action.is_some() {
            return Err(rule_error(
                rule_id,
                &format!("{} rules take an override_action, not an action", rule_type),
            ));
        }
        let t = override_action.ok_or_else(|| {
            rule_error(rule_id, &format!("{} rules require an override_action", rule_type))
        })?;
        RuleKind::Group {
            override_action: t
                .parse::<WafOverrideActionType>()
                .map_err(|e| rule_error(rule_id, &e.to_string()))?,
        }
    } else {
        if override_action.is_some() {
            return Err(rule_error(
                rule_id,
                &format!("{} rules take an action, not an override_action", rule_type),
            ));
        }
        let t = action.ok_or_else(|| {
            rule_error(rule_id, &format!("{} rules require an action", rule_type))
        })?;
        let action = t
            .parse::<WafActionType>()
            .map_err(|e| rule_error(rule_id, &e.to_string()))?;
        match rule_type {
            WafRuleType::RateBased => RuleKind::RateBased { action },
            _ => RuleKind::Regular { action },
        }
    };

    Ok(RuleBinding::new(rule_id, priority, kind))
}

fn rule_error(rule: &str, message: &str) -> WebAclError {
    WebAclError::invalid_config(RULES, format!("rule {}: {}", rule, message))
}

fn lookup<'a>(attrs: &'a Attributes, key: &str) -> Option<&'a Value> {
    attrs.get(key).filter(|v| !v.is_null())
}

fn required_str<'a>(attrs: &'a Attributes, key: &str) -> Result<&'a str> {
    match lookup(attrs, key) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(WebAclError::invalid_config(key, "must be a string")),
        None => Err(WebAclError::invalid_config(key, "is required")),
    }
}

/// Reads the `type` out of an at-most-one-element `[{"type": ...}]` list.
fn payload_type<'a>(field: &str, value: &'a Value) -> Result<Option<&'a str>> {
    let items = value
        .as_array()
        .ok_or_else(|| WebAclError::invalid_config(field, "action blocks must be lists"))?;

    match items.as_slice() {
        [] => Ok(None),
        [item] => item
            .get(TYPE)
            .and_then(Value::as_str)
            .map(Some)
            .ok_or_else(|| WebAclError::invalid_config(field, "action block requires a type")),
        _ => Err(WebAclError::invalid_config(
            field,
            format!("at most one action block is allowed, got {}", items.len()),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn attrs(value: Value) -> Attributes {
        serde_json::from_value(value).unwrap()
    }

    fn field_of(err: WebAclError) -> String {
        match err {
            WebAclError::InvalidConfig { field, .. } => field,
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_expand_full_bag() {
        let spec = expand(&attrs(json!({
            "name": "acl1",
            "metric_name": "acl1Metric",
            "default_action": [{"type": "ALLOW"}],
            "rules": [
                {"rule_id": "r1", "priority": 1, "action": [{"type": "BLOCK"}]},
                {"rule_id": "g1", "priority": 2, "type": "GROUP", "override_action": [{"type": "COUNT"}]},
                {"rule_id": "rb1", "priority": 3, "type": "RATE_BASED", "action": [{"type": "COUNT"}]},
            ],
        })))
        .unwrap();

        assert_eq!(spec.name, "acl1");
        assert_eq!(spec.metric_name.as_str(), "acl1Metric");
        assert_eq!(spec.default_action, WafActionType::Allow);
        assert_eq!(
            spec.rules,
            vec![
                RuleBinding::new(
                    "r1",
                    1,
                    RuleKind::Regular {
                        action: WafActionType::Block
                    }
                ),
                RuleBinding::new(
                    "g1",
                    2,
                    RuleKind::Group {
                        override_action: WafOverrideActionType::Count
                    }
                ),
                RuleBinding::new(
                    "rb1",
                    3,
                    RuleKind::RateBased {
                        action: WafActionType::Count
                    }
                ),
            ]
        );
    }

    #[test]
    fn test_missing_rules_is_empty() {
        assert!(expand_rules(&attrs(json!({}))).unwrap().is_empty());
        assert!(expand_rules(&attrs(json!({"rules": null}))).unwrap().is_empty());
    }

    #[test]
    fn test_metric_name_pattern() {
        let err = expand_metric_name(&attrs(json!({"metric_name": "acl-1"}))).unwrap_err();
        assert_eq!(field_of(err), METRIC_NAME);
    }

    #[test]
    fn test_default_action_cardinality() {
        for bad in [
            json!({}),
            json!({"default_action": []}),
            json!({"default_action": [{"type": "ALLOW"}, {"type": "BLOCK"}]}),
            json!({"default_action": [{"type": "allow"}]}),
        ] {
            let err = expand_default_action(&attrs(bad)).unwrap_err();
            assert_eq!(field_of(err), DEFAULT_ACTION);
        }
    }

    #[test]
    fn test_group_rule_without_override_action_names_rule() {
        let err = expand_rules(&attrs(json!({
            "rules": [{"rule_id": "g1", "priority": 1, "type": "GROUP", "action": [{"type": "BLOCK"}]}]
        })))
        .unwrap_err();

        let msg = err.to_string();
        assert!(msg.contains("rule g1"), "{}", msg);
    }

    #[test]
    fn test_regular_rule_requires_action() {
        let err = expand_rules(&attrs(json!({
            "rules": [{"rule_id": "r1", "priority": 1}]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("REGULAR rules require an action"));

        let err = expand_rules(&attrs(json!({
            "rules": [{
                "rule_id": "r1",
                "priority": 1,
                "action": [{"type": "BLOCK"}],
                "override_action": [{"type": "NONE"}],
            }]
        })))
        .unwrap_err();
        assert_eq!(field_of(err), RULES);
    }

    #[test]
    fn test_unknown_rule_type_rejected() {
        let err = expand_rules(&attrs(json!({
            "rules": [{"rule_id": "r1", "priority": 1, "type": "MANAGED", "action": [{"type": "BLOCK"}]}]
        })))
        .unwrap_err();
        assert_eq!(field_of(err), RULES);
    }

    #[test]
    fn test_rule_requires_integer_priority() {
        let err = expand_rules(&attrs(json!({
            "rules": [{"rule_id": "r1", "priority": "1", "action": [{"type": "BLOCK"}]}]
        })))
        .unwrap_err();
        assert!(err.to_string().contains("priority"));
    }
}
