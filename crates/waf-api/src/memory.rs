//! In-process WAF backend.
//!
//! [`MemoryWafApi`] keeps Web ACLs in memory and enforces the same change
//! token rules as the service:
//!
//! - a token is only valid in the scope that issued it
//! - a token is invalidated by the first mutation in its scope that commits,
//!   whichever token that mutation used
//! - an ACL can only be deleted once all of its rules are gone
//!
//! Every call is recorded so callers can assert on call order, and failures
//! can be queued per operation to exercise retry paths.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use log::debug;
use serde::{Deserialize, Serialize};
use waf_types::{ChangeAction, ChangeToken, MetricName, TokenScope};

use crate::api::{ApiOperation, WafApi};
use crate::error::{WafError, WafErrorCode, WafResult};
use crate::types::{
    ActivatedRule, CreateWebAclInput, CreateWebAclOutput, DeleteWebAclInput, UpdateWebAclInput,
    WafAction, WebAcl, WebAclUpdate,
};

/// A recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    GetChangeToken {
        scope: TokenScope,
    },
    CreateWebAcl {
        name: String,
    },
    GetWebAcl {
        web_acl_id: String,
    },
    UpdateWebAcl {
        web_acl_id: String,
        default_action: Option<WafAction>,
        updates: Vec<WebAclUpdate>,
    },
    DeleteWebAcl {
        web_acl_id: String,
    },
}

impl ApiCall {
    /// Returns the operation this call invoked.
    pub fn operation(&self) -> ApiOperation {
        match self {
            Self::GetChangeToken { .. } => ApiOperation::GetChangeToken,
            Self::CreateWebAcl { .. } => ApiOperation::CreateWebAcl,
            Self::GetWebAcl { .. } => ApiOperation::GetWebAcl,
            Self::UpdateWebAcl { .. } => ApiOperation::UpdateWebAcl,
            Self::DeleteWebAcl { .. } => ApiOperation::DeleteWebAcl,
        }
    }
}

/// Persistable backend contents.
///
/// Outstanding change tokens are short-lived and are not part of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemorySnapshot {
    #[serde(default)]
    pub scope: TokenScope,
    #[serde(default)]
    pub next_web_acl: u64,
    #[serde(default)]
    pub web_acls: Vec<WebAcl>,
}

#[derive(Debug, Default)]
struct Inner {
    /// Bumped on every committed mutation.
    generation: u64,
    next_token: u64,
    next_web_acl: u64,
    /// Outstanding tokens: token -> generation it was issued in.
    tokens: HashMap<String, u64>,
    web_acls: BTreeMap<String, WebAcl>,
    calls: Vec<ApiCall>,
    faults: HashMap<ApiOperation, VecDeque<WafError>>,
}

impl Inner {
    fn record(&mut self, call: ApiCall) -> WafResult<()> {
        let op = call.operation();
        self.calls.push(call);
        match self.faults.get_mut(&op).and_then(|q| q.pop_front()) {
            Some(err) => {
                debug!("Injected failure for {}: {}", op, err);
                Err(err)
            }
            None => Ok(()),
        }
    }

    fn check_token(&self, token: &ChangeToken) -> WafResult<()> {
        match self.tokens.get(token.as_str()) {
            Some(generation) if *generation == self.generation => Ok(()),
            Some(_) => Err(WafError::stale_data(format!(
                "change token {} was invalidated by a newer change",
                token
            ))),
            None => Err(WafError::stale_data(format!(
                "change token {} is unknown or already used",
                token
            ))),
        }
    }

    fn commit(&mut self) {
        self.generation += 1;
        self.tokens.clear();
    }
}

/// In-memory [`WafApi`] implementation serving a single token scope.
#[derive(Debug)]
pub struct MemoryWafApi {
    scope: TokenScope,
    inner: Mutex<Inner>,
}

impl MemoryWafApi {
    /// Creates an empty backend for the given scope.
    pub fn new(scope: TokenScope) -> Self {
        Self {
            scope,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Restores a backend from a snapshot.
    pub fn from_snapshot(snapshot: MemorySnapshot) -> Self {
        let inner = Inner {
            next_web_acl: snapshot.next_web_acl,
            web_acls: snapshot
                .web_acls
                .into_iter()
                .map(|acl| (acl.web_acl_id.clone(), acl))
                .collect(),
            ..Inner::default()
        };
        Self {
            scope: snapshot.scope,
            inner: Mutex::new(inner),
        }
    }

    /// Captures the backend contents.
    pub fn snapshot(&self) -> MemorySnapshot {
        let inner = self.state();
        MemorySnapshot {
            scope: self.scope.clone(),
            next_web_acl: inner.next_web_acl,
            web_acls: inner.web_acls.values().cloned().collect(),
        }
    }

    /// Returns the scope this backend serves.
    pub fn scope(&self) -> &TokenScope {
        &self.scope
    }

    /// Returns every call made so far, in order.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.state().calls.clone()
    }

    /// Returns the number of calls made to an operation.
    pub fn call_count(&self, op: ApiOperation) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| c.operation() == op)
            .count()
    }

    /// Forgets the recorded calls.
    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Makes the next call to `op` fail with `error`.
    pub fn fail_next(&self, op: ApiOperation, error: WafError) {
        self.fail_times(op, error, 1);
    }

    /// Makes the next `times` calls to `op` fail with `error`.
    pub fn fail_times(&self, op: ApiOperation, error: WafError, times: usize) {
        let mut inner = self.state();
        let queue = inner.faults.entry(op).or_default();
        queue.extend(std::iter::repeat(error).take(times));
    }

    /// Simulates a mutation committed by another client in this scope,
    /// invalidating every outstanding change token.
    pub fn commit_external_change(&self) {
        self.state().commit();
    }

    /// Returns the number of Web ACLs held.
    pub fn web_acl_count(&self) -> usize {
        self.state().web_acls.len()
    }

    fn state(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl WafApi for MemoryWafApi {
    fn get_change_token(&self, scope: &TokenScope) -> WafResult<ChangeToken> {
        let mut inner = self.state();
        inner.record(ApiCall::GetChangeToken {
            scope: scope.clone(),
        })?;

        if *scope != self.scope {
            return Err(WafError::invalid_parameter(format!(
                "scope {} is not served by this endpoint ({})",
                scope, self.scope
            )));
        }

        inner.next_token += 1;
        let token = format!("{}-{:08x}-{:04x}", self.scope, inner.next_token, inner.generation);
        let generation = inner.generation;
        inner.tokens.insert(token.clone(), generation);
        Ok(ChangeToken::new(token))
    }

    fn create_web_acl(&self, input: CreateWebAclInput) -> WafResult<CreateWebAclOutput> {
        let mut inner = self.state();
        inner.record(ApiCall::CreateWebAcl {
            name: input.name.clone(),
        })?;
        inner.check_token(&input.change_token)?;

        if input.name.is_empty() {
            return Err(WafError::invalid_parameter("name must not be empty"));
        }
        MetricName::new(input.metric_name.as_str())
            .map_err(|e| WafError::invalid_parameter(e.to_string()))?;
        if inner.web_acls.values().any(|acl| acl.name == input.name) {
            return Err(WafError::new(
                WafErrorCode::DisallowedName,
                format!("a Web ACL named {} already exists", input.name),
            ));
        }

        inner.next_web_acl += 1;
        let web_acl = WebAcl {
            web_acl_id: format!("webacl-{:08x}", inner.next_web_acl),
            name: input.name,
            metric_name: input.metric_name,
            default_action: input.default_action,
            rules: Vec::new(),
        };
        inner
            .web_acls
            .insert(web_acl.web_acl_id.clone(), web_acl.clone());
        inner.commit();

        Ok(CreateWebAclOutput {
            change_token: input.change_token,
            web_acl,
        })
    }

    fn get_web_acl(&self, web_acl_id: &str) -> WafResult<WebAcl> {
        let mut inner = self.state();
        inner.record(ApiCall::GetWebAcl {
            web_acl_id: web_acl_id.to_string(),
        })?;

        inner
            .web_acls
            .get(web_acl_id)
            .cloned()
            .ok_or_else(|| WafError::nonexistent_item(format!("Web ACL {} not found", web_acl_id)))
    }

    fn update_web_acl(&self, input: UpdateWebAclInput) -> WafResult<ChangeToken> {
        let mut inner = self.state();
        inner.record(ApiCall::UpdateWebAcl {
            web_acl_id: input.web_acl_id.clone(),
            default_action: input.default_action,
            updates: input.updates.clone(),
        })?;
        inner.check_token(&input.change_token)?;

        let current = inner.web_acls.get(&input.web_acl_id).ok_or_else(|| {
            WafError::nonexistent_item(format!("Web ACL {} not found", input.web_acl_id))
        })?;

        // Applied to a copy so a rejected batch leaves the ACL untouched.
        let mut rules = current.rules.clone();
        for update in &input.updates {
            apply_update(&mut rules, update)?;
        }
        check_unique_priorities(&rules)?;

        let acl = inner
            .web_acls
            .get_mut(&input.web_acl_id)
            .ok_or_else(|| WafError::nonexistent_item(input.web_acl_id.clone()))?;
        acl.rules = rules;
        if let Some(default_action) = input.default_action {
            acl.default_action = default_action;
        }
        inner.commit();

        Ok(input.change_token)
    }

    fn delete_web_acl(&self, input: DeleteWebAclInput) -> WafResult<ChangeToken> {
        let mut inner = self.state();
        inner.record(ApiCall::DeleteWebAcl {
            web_acl_id: input.web_acl_id.clone(),
        })?;
        inner.check_token(&input.change_token)?;

        let acl = inner.web_acls.get(&input.web_acl_id).ok_or_else(|| {
            WafError::nonexistent_item(format!("Web ACL {} not found", input.web_acl_id))
        })?;
        if !acl.rules.is_empty() {
            return Err(WafError::non_empty_entity(format!(
                "Web ACL {} still has {} rule(s)",
                input.web_acl_id,
                acl.rules.len()
            )));
        }

        inner.web_acls.remove(&input.web_acl_id);
        inner.commit();

        Ok(input.change_token)
    }
}

fn validate_activated_rule(rule: &ActivatedRule) -> WafResult<()> {
    if rule.rule_id.is_empty() {
        return Err(WafError::invalid_parameter("rule_id must not be empty"));
    }

    let kind = rule.rule_type;
    match (
        kind.uses_override_action(),
        rule.action.is_some(),
        rule.override_action.is_some(),
    ) {
        (true, false, true) | (false, true, false) => Ok(()),
        (true, true, _) => Err(WafError::invalid_parameter(format!(
            "rule {} of type {} must not carry an action",
            rule.rule_id, kind
        ))),
        (true, false, false) => Err(WafError::invalid_parameter(format!(
            "rule {} of type {} requires an override action",
            rule.rule_id, kind
        ))),
        (false, _, true) => Err(WafError::invalid_parameter(format!(
            "rule {} of type {} must not carry an override action",
            rule.rule_id, kind
        ))),
        (false, false, false) => Err(WafError::invalid_parameter(format!(
            "rule {} of type {} requires an action",
            rule.rule_id, kind
        ))),
    }
}

fn apply_update(rules: &mut Vec<ActivatedRule>, update: &WebAclUpdate) -> WafResult<()> {
    let rule = &update.activated_rule;
    validate_activated_rule(rule)?;

    let existing = rules.iter().position(|r| r.rule_id == rule.rule_id);
    match (update.action, existing) {
        // Re-inserting a bound rule replaces its binding.
        (ChangeAction::Insert, Some(idx)) => rules[idx] = rule.clone(),
        (ChangeAction::Insert, None) => rules.push(rule.clone()),
        (ChangeAction::Delete, Some(idx)) => {
            rules.remove(idx);
        }
        (ChangeAction::Delete, None) => {
            return Err(WafError::nonexistent_item(format!(
                "rule {} is not bound to this Web ACL",
                rule.rule_id
            )));
        }
    }
    Ok(())
}

fn check_unique_priorities(rules: &[ActivatedRule]) -> WafResult<()> {
    let mut seen = HashSet::new();
    for rule in rules {
        if !seen.insert(rule.priority) {
            return Err(WafError::invalid_parameter(format!(
                "priority {} is used by more than one rule",
                rule.priority
            )));
        }
    }
    Ok(())
}
