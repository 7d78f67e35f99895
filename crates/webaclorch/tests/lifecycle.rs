//! End-to-end lifecycle tests against the in-memory WAF backend.

use std::cell::Cell;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use waf_api::{
    ActivatedRule, ApiCall, ApiOperation, CreateWebAclInput, CreateWebAclOutput,
    DeleteWebAclInput, MemoryWafApi, UpdateWebAclInput, WafAction, WafApi, WafError,
    WafErrorCode, WafResult, WebAcl, WebAclUpdate,
};
use waf_orch_common::{Attributes, Resource, ResourceData, RetryError, RetryPolicy};
use waf_types::{ChangeAction, ChangeToken, TokenScope, WafActionType, WafRuleType};
use waf_webaclorch::{WebAclError, WebAclOrch};

fn attrs(value: Value) -> Attributes {
    serde_json::from_value(value).unwrap()
}

fn orch<A: WafApi>(api: A, attempts: u32) -> WebAclOrch<A> {
    WebAclOrch::new(api, TokenScope::Global)
        .with_policy(RetryPolicy::without_backoff(attempts))
        .with_sleep(Arc::new(|_| {}))
}

fn acl1() -> Attributes {
    attrs(json!({
        "name": "acl1",
        "metric_name": "acl1Metric",
        "default_action": [{"type": "ALLOW"}],
        "rules": [
            {"rule_id": "r1", "priority": 1, "type": "REGULAR", "action": [{"type": "BLOCK"}]},
        ],
    }))
}

fn three_rules() -> Attributes {
    attrs(json!({
        "name": "acl3",
        "metric_name": "acl3Metric",
        "default_action": [{"type": "BLOCK"}],
        "rules": [
            {"rule_id": "r1", "priority": 1, "action": [{"type": "ALLOW"}]},
            {"rule_id": "rate1", "priority": 2, "type": "RATE_BASED", "action": [{"type": "COUNT"}]},
            {"rule_id": "group1", "priority": 3, "type": "GROUP", "override_action": [{"type": "NONE"}]},
        ],
    }))
}

fn operations(api: &MemoryWafApi) -> Vec<ApiOperation> {
    api.calls().iter().map(ApiCall::operation).collect()
}

fn token_call() -> ApiCall {
    ApiCall::GetChangeToken {
        scope: TokenScope::Global,
    }
}

#[test]
fn test_create_acl1_scenario() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 3);
    let mut d = ResourceData::new(acl1());

    orch.create(&mut d).unwrap();

    let id = d.id().unwrap().to_string();
    assert!(!id.is_empty());

    let r1 = ActivatedRule {
        priority: 1,
        rule_id: "r1".to_string(),
        rule_type: WafRuleType::Regular,
        action: Some(WafAction::new(WafActionType::Block)),
        override_action: None,
    };
    assert_eq!(
        api.calls(),
        vec![
            token_call(),
            ApiCall::CreateWebAcl {
                name: "acl1".to_string(),
            },
            token_call(),
            ApiCall::UpdateWebAcl {
                web_acl_id: id.clone(),
                default_action: Some(WafAction::new(WafActionType::Allow)),
                updates: vec![WebAclUpdate {
                    action: ChangeAction::Insert,
                    activated_rule: r1.clone(),
                }],
            },
            ApiCall::GetWebAcl {
                web_acl_id: id.clone(),
            },
        ]
    );

    assert_eq!(
        api.get_web_acl(&id).unwrap(),
        WebAcl {
            web_acl_id: id.clone(),
            name: "acl1".to_string(),
            metric_name: "acl1Metric".to_string(),
            default_action: WafAction::new(WafActionType::Allow),
            rules: vec![r1],
        }
    );
}

#[test]
fn test_read_returns_submitted_attributes() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 3);
    let mut d = ResourceData::new(acl1());
    orch.create(&mut d).unwrap();

    let mut refreshed = ResourceData::from_recorded(d.into_state());
    orch.read(&mut refreshed).unwrap();

    assert_eq!(refreshed.get_str("name"), Some("acl1"));
    assert_eq!(refreshed.get_str("metric_name"), Some("acl1Metric"));
    assert_eq!(
        refreshed.get("default_action"),
        Some(&json!([{"type": "ALLOW"}]))
    );
    assert_eq!(refreshed.attributes(), &acl1());
}

#[test]
fn test_update_resends_every_rule_as_insert() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 3);
    let mut d = ResourceData::new(acl1());
    orch.create(&mut d).unwrap();

    let mut desired = acl1();
    desired.insert(
        "default_action".to_string(),
        json!([{"type": "BLOCK"}]),
    );
    desired.insert(
        "rules".to_string(),
        json!([
            {"rule_id": "r1", "priority": 1, "action": [{"type": "BLOCK"}]},
            {"rule_id": "r2", "priority": 2, "action": [{"type": "COUNT"}]},
        ]),
    );
    let mut d = ResourceData::from_state(d.into_state(), desired);
    api.clear_calls();

    orch.update(&mut d).unwrap();

    let (default_action, updates) = api
        .calls()
        .into_iter()
        .find_map(|c| match c {
            ApiCall::UpdateWebAcl {
                default_action,
                updates,
                ..
            } => Some((default_action, updates)),
            _ => None,
        })
        .unwrap();
    assert_eq!(default_action, Some(WafAction::new(WafActionType::Block)));
    assert_eq!(updates.len(), 2);
    assert!(updates.iter().all(|u| u.action == ChangeAction::Insert));

    // Read after update reflects the remote.
    assert_eq!(d.get("default_action"), Some(&json!([{"type": "BLOCK"}])));
    assert_eq!(d.get("rules").and_then(Value::as_array).map(Vec::len), Some(2));
}

#[test]
fn test_one_transient_failure_then_success() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 5);
    let mut d = ResourceData::new(acl1());
    orch.create(&mut d).unwrap();
    let mut d = ResourceData::from_recorded(d.into_state());
    api.clear_calls();

    api.fail_next(
        ApiOperation::UpdateWebAcl,
        WafError::stale_data("token superseded"),
    );
    orch.update(&mut d).unwrap();

    assert_eq!(api.call_count(ApiOperation::GetChangeToken), 2);
    assert_eq!(api.call_count(ApiOperation::UpdateWebAcl), 2);

    let tokens: Vec<ApiOperation> = operations(&api);
    assert_eq!(
        tokens,
        vec![
            ApiOperation::GetChangeToken,
            ApiOperation::UpdateWebAcl,
            ApiOperation::GetChangeToken,
            ApiOperation::UpdateWebAcl,
            ApiOperation::GetWebAcl,
        ]
    );
}

#[test]
fn test_persistent_transient_failure_exhausts_budget() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 4);
    let mut d = ResourceData::new(acl1());
    orch.create(&mut d).unwrap();
    let mut d = ResourceData::from_recorded(d.into_state());
    api.clear_calls();

    api.fail_times(
        ApiOperation::UpdateWebAcl,
        WafError::throttling("slow down"),
        100,
    );
    let err = orch.update(&mut d).unwrap_err();

    match &err {
        WebAclError::Api { context, source } => {
            assert_eq!(context, "Error Updating WAF ACL");
            assert!(matches!(source, RetryError::Exhausted { attempts: 4, .. }));
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(api.call_count(ApiOperation::UpdateWebAcl), 4);
    assert_eq!(api.call_count(ApiOperation::GetChangeToken), 4);
    assert_eq!(api.call_count(ApiOperation::GetWebAcl), 0);
}

#[test]
fn test_fatal_error_not_retried() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 5);
    orch.create(&mut ResourceData::new(acl1())).unwrap();
    api.clear_calls();

    let mut d = ResourceData::new(acl1());
    let err = orch.create(&mut d).unwrap_err();

    assert!(err.to_string().starts_with("Error Creating WAF ACL"));
    match err {
        WebAclError::Api { source, .. } => {
            assert_eq!(source.waf_error().code, WafErrorCode::DisallowedName)
        }
        other => panic!("unexpected error {:?}", other),
    }
    assert_eq!(api.call_count(ApiOperation::CreateWebAcl), 1);
    assert!(d.id().is_none());
}

/// Commits a competing change right after handing out selected tokens, as
/// a concurrent mutator in the same scope would.
struct ContendedApi<'a> {
    inner: &'a MemoryWafApi,
    contend_on_tokens: Vec<usize>,
    issued: Cell<usize>,
}

impl WafApi for ContendedApi<'_> {
    fn get_change_token(&self, scope: &TokenScope) -> WafResult<ChangeToken> {
        let token = self.inner.get_change_token(scope)?;
        let n = self.issued.get() + 1;
        self.issued.set(n);
        if self.contend_on_tokens.contains(&n) {
            self.inner.commit_external_change();
        }
        Ok(token)
    }

    fn create_web_acl(&self, input: CreateWebAclInput) -> WafResult<CreateWebAclOutput> {
        self.inner.create_web_acl(input)
    }

    fn get_web_acl(&self, web_acl_id: &str) -> WafResult<WebAcl> {
        self.inner.get_web_acl(web_acl_id)
    }

    fn update_web_acl(&self, input: UpdateWebAclInput) -> WafResult<ChangeToken> {
        self.inner.update_web_acl(input)
    }

    fn delete_web_acl(&self, input: DeleteWebAclInput) -> WafResult<ChangeToken> {
        self.inner.delete_web_acl(input)
    }
}

#[test]
fn test_concurrent_mutator_forces_retry_with_new_token() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let contended = ContendedApi {
        inner: &api,
        // First token of create, first token of the follow-up update.
        contend_on_tokens: vec![1, 3],
        issued: Cell::new(0),
    };
    let orch = orch(&contended, 5);
    let mut d = ResourceData::new(acl1());

    orch.create(&mut d).unwrap();

    assert_eq!(api.call_count(ApiOperation::CreateWebAcl), 2);
    assert_eq!(api.call_count(ApiOperation::UpdateWebAcl), 2);
    assert_eq!(api.call_count(ApiOperation::GetChangeToken), 4);
    assert_eq!(api.web_acl_count(), 1);
    assert_eq!(d.get_str("name"), Some("acl1"));
}

#[test]
fn test_delete_drains_rules_before_deleting() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 3);
    let mut d = ResourceData::new(three_rules());
    orch.create(&mut d).unwrap();
    let id = d.id().unwrap().to_string();

    let mut d = ResourceData::from_recorded(d.into_state());
    api.clear_calls();
    orch.delete(&mut d).unwrap();

    let calls = api.calls();
    assert_eq!(
        calls.iter().map(ApiCall::operation).collect::<Vec<_>>(),
        vec![
            ApiOperation::GetChangeToken,
            ApiOperation::UpdateWebAcl,
            ApiOperation::GetChangeToken,
            ApiOperation::DeleteWebAcl,
        ]
    );
    match &calls[1] {
        ApiCall::UpdateWebAcl {
            default_action,
            updates,
            ..
        } => {
            assert_eq!(*default_action, None);
            assert_eq!(updates.len(), 3);
            assert!(updates.iter().all(|u| u.action == ChangeAction::Delete));
            let group = updates
                .iter()
                .find(|u| u.activated_rule.rule_type == WafRuleType::Group)
                .unwrap();
            assert!(group.activated_rule.action.is_none());
            assert!(group.activated_rule.override_action.is_some());
        }
        other => panic!("unexpected call {:?}", other),
    }
    assert_eq!(calls[3], ApiCall::DeleteWebAcl { web_acl_id: id });
    assert!(d.id().is_none());
    assert_eq!(api.web_acl_count(), 0);
    assert_eq!(orch.stats().rules_deleted, 3);
}

#[test]
fn test_delete_without_rules_skips_drain() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 3);
    let mut bag = acl1();
    bag.remove("rules");
    let mut d = ResourceData::new(bag);
    orch.create(&mut d).unwrap();

    let mut d = ResourceData::from_recorded(d.into_state());
    api.clear_calls();
    orch.delete(&mut d).unwrap();

    assert_eq!(
        operations(&api),
        vec![ApiOperation::GetChangeToken, ApiOperation::DeleteWebAcl]
    );
}

#[test]
fn test_failed_drain_never_deletes_acl() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 3);
    let mut d = ResourceData::new(three_rules());
    orch.create(&mut d).unwrap();

    let mut d = ResourceData::from_recorded(d.into_state());
    api.fail_next(
        ApiOperation::UpdateWebAcl,
        WafError::new(WafErrorCode::InternalError, "backend unavailable"),
    );
    let err = orch.delete(&mut d).unwrap_err();

    assert!(err.to_string().starts_with("Error Removing WAF ACL Rules"));
    assert_eq!(api.call_count(ApiOperation::DeleteWebAcl), 0);
    assert!(d.id().is_some());
    assert_eq!(api.web_acl_count(), 1);
}

#[test]
fn test_read_not_found_clears_id_and_is_idempotent() {
    let api = MemoryWafApi::new(TokenScope::Global);
    let orch = orch(&api, 3);
    let mut d = ResourceData::new(acl1());
    orch.create(&mut d).unwrap();

    // Delete out of band.
    let mut other = ResourceData::from_recorded(d.clone().into_state());
    orch.delete(&mut other).unwrap();

    api.clear_calls();
    orch.read(&mut d).unwrap();
    assert!(d.id().is_none());
    assert_eq!(api.calls().len(), 1);

    orch.read(&mut d).unwrap();
    assert!(d.id().is_none());
    assert_eq!(api.calls().len(), 1);
}

#[test]
fn test_regional_scope() {
    let scope = TokenScope::Regional("eu-west-1".to_string());
    let api = MemoryWafApi::new(scope.clone());
    let orch = WebAclOrch::new(&api, scope.clone())
        .with_policy(RetryPolicy::without_backoff(3))
        .with_sleep(Arc::new(|_| {}));
    let mut d = ResourceData::new(acl1());

    orch.create(&mut d).unwrap();
    assert!(api
        .calls()
        .iter()
        .all(|c| !matches!(c, ApiCall::GetChangeToken { scope: s } if *s != scope)));

    // Tokens from another scope are rejected by the endpoint.
    let global = orch_with_scope(&api, TokenScope::Global);
    let err = global.create(&mut ResourceData::new(three_rules())).unwrap_err();
    assert_eq!(
        match err {
            WebAclError::Api { source, .. } => source.waf_error().code,
            other => panic!("unexpected error {:?}", other),
        },
        WafErrorCode::InvalidParameter
    );
}

fn orch_with_scope(api: &MemoryWafApi, scope: TokenScope) -> WebAclOrch<&MemoryWafApi> {
    WebAclOrch::new(api, scope)
        .with_policy(RetryPolicy::without_backoff(3))
        .with_sleep(Arc::new(|_| {}))
}
