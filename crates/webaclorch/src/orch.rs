//! WebAclOrch - Web ACL lifecycle orchestration.
//!
//! Drives a Web ACL through create, read, update and delete against a
//! [`WafApi`]. Every mutation runs under a fresh change token obtained
//! through [`WafRetryer`]; rule bindings are always resent in full.

use std::cell::Cell;

use log::{debug, info, warn};
use waf_api::{
    CreateWebAclInput, DeleteWebAclInput, UpdateWebAclInput, WafAction, WafApi, WebAclUpdate,
};
use waf_orch_common::{Resource, ResourceData, RetryError, RetryPolicy, SleepFn, WafRetryer};
use waf_types::{ChangeAction, TokenScope};

use crate::config_file::WebAclOrchConfig;
use crate::error::{Result, WebAclError};
use crate::schema::{self, DEFAULT_ACTION, METRIC_NAME, NAME, RULES};
use crate::translate::{self, build_updates};

const CREATE_CONTEXT: &str = "Error Creating WAF ACL";
const READ_CONTEXT: &str = "Error Reading WAF ACL";
const UPDATE_CONTEXT: &str = "Error Updating WAF ACL";
const DRAIN_CONTEXT: &str = "Error Removing WAF ACL Rules";
const DELETE_CONTEXT: &str = "Error Deleting WAF ACL";

/// Resource type name.
pub const RESOURCE_TYPE: &str = "aws_waf_web_acl";

/// WebAclOrch statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WebAclOrchStats {
    /// Number of Web ACLs created.
    pub acls_created: u64,
    /// Number of Web ACLs deleted.
    pub acls_deleted: u64,
    /// Number of UpdateWebACL calls that succeeded.
    pub acls_updated: u64,
    /// Number of rule bindings sent as INSERT.
    pub rules_inserted: u64,
    /// Number of rule bindings sent as DELETE.
    pub rules_deleted: u64,
    /// Number of failed API calls surfaced to the caller.
    pub api_errors: u64,
}

/// Orchestrates a single Web ACL resource type against one token scope.
pub struct WebAclOrch<A> {
    api: A,
    scope: TokenScope,
    policy: RetryPolicy,
    sleep: Option<SleepFn>,
    stats: Cell<WebAclOrchStats>,
}

impl<A: WafApi> WebAclOrch<A> {
    /// Creates an orchestrator with the default retry policy.
    pub fn new(api: A, scope: TokenScope) -> Self {
        Self {
            api,
            scope,
            policy: RetryPolicy::default(),
            sleep: None,
            stats: Cell::new(WebAclOrchStats::default()),
        }
    }

    /// Creates an orchestrator from daemon configuration.
    pub fn from_config(api: A, config: &WebAclOrchConfig) -> Self {
        Self::new(api, config.backend.scope.clone()).with_policy(config.retry_policy())
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replaces the backoff sleep (tests use a no-op).
    pub fn with_sleep(mut self, sleep: SleepFn) -> Self {
        self.sleep = Some(sleep);
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn scope(&self) -> &TokenScope {
        &self.scope
    }

    pub fn stats(&self) -> WebAclOrchStats {
        self.stats.get()
    }

    fn bump(&self, f: impl FnOnce(&mut WebAclOrchStats)) {
        let mut stats = self.stats.get();
        f(&mut stats);
        self.stats.set(stats);
    }

    fn api_error(&self, context: &str, err: RetryError) -> WebAclError {
        self.bump(|s| s.api_errors += 1);
        WebAclError::api(context, err)
    }

    fn retryer(&self) -> WafRetryer<'_, A> {
        let retryer = WafRetryer::new(&self.api, self.scope.clone()).with_policy(self.policy.clone());
        match &self.sleep {
            Some(sleep) => retryer.with_sleep(sleep.clone()),
            None => retryer,
        }
    }

    /// Sends one UpdateWebACL call under a fresh change token.
    fn send_updates(
        &self,
        web_acl_id: &str,
        default_action: Option<WafAction>,
        updates: Vec<WebAclUpdate>,
        context: &str,
    ) -> Result<()> {
        for update in &updates {
            debug!(
                "WebAclOrch: {} rule {} (priority {}, type {}) on {}",
                update.action,
                update.activated_rule.rule_id,
                update.activated_rule.priority,
                update.activated_rule.rule_type,
                web_acl_id
            );
        }

        self.retryer()
            .retry_with_token("UpdateWebACL", |token| {
                self.api.update_web_acl(UpdateWebAclInput {
                    change_token: token.clone(),
                    web_acl_id: web_acl_id.to_string(),
                    default_action,
                    updates: updates.clone(),
                })
            })
            .map_err(|e| self.api_error(context, e))?;

        let count = updates.len() as u64;
        let change = updates.first().map(|u| u.action);
        self.bump(|s| {
            s.acls_updated += 1;
            match change {
                Some(ChangeAction::Insert) => s.rules_inserted += count,
                Some(ChangeAction::Delete) => s.rules_deleted += count,
                None => {}
            }
        });
        Ok(())
    }
}

impl<A: WafApi> Resource for WebAclOrch<A> {
    type Error = WebAclError;

    fn type_name(&self) -> &str {
        RESOURCE_TYPE
    }

    fn create(&self, d: &mut ResourceData) -> Result<()> {
        let name = schema::expand_name(d.attributes())?;
        let metric_name = schema::expand_metric_name(d.attributes())?;
        let default_action = WafAction::new(schema::expand_default_action(d.attributes())?);
        // Validate rules before anything is created remotely.
        schema::expand_rules(d.attributes())?;

        info!("WebAclOrch: Creating WAF Web ACL {}", name);
        let output = self
            .retryer()
            .retry_with_token("CreateWebACL", |token| {
                self.api.create_web_acl(CreateWebAclInput {
                    change_token: token.clone(),
                    name: name.clone(),
                    metric_name: metric_name.to_string(),
                    default_action,
                })
            })
            .map_err(|e| self.api_error(CREATE_CONTEXT, e))?;

        let id = output.web_acl.web_acl_id;
        info!("WebAclOrch: Created WAF Web ACL {} ({})", name, id);
        d.set_id(id);
        self.bump(|s| s.acls_created += 1);

        self.update(d)
    }

    fn read(&self, d: &mut ResourceData) -> Result<()> {
        let Some(id) = d.id().map(str::to_string) else {
            return Ok(());
        };

        let acl = match self.api.get_web_acl(&id) {
            Ok(acl) => acl,
            Err(e) if e.is_not_found() => {
                warn!("WebAclOrch: WAF ACL ({}) not found, removing from state", id);
                d.clear_id();
                return Ok(());
            }
            Err(e) => {
                return Err(self.api_error(
                    READ_CONTEXT,
                    RetryError::Fatal {
                        operation: "GetWebACL".to_string(),
                        source: e,
                    },
                ))
            }
        };

        d.set(NAME, acl.name.as_str());
        d.set(METRIC_NAME, acl.metric_name.as_str());
        d.set(
            DEFAULT_ACTION,
            translate::flatten_default_action(&acl.default_action),
        );
        d.set(RULES, translate::flatten_rules(&acl.rules));
        Ok(())
    }

    fn update(&self, d: &mut ResourceData) -> Result<()> {
        let id = d.id().ok_or(WebAclError::MissingId)?.to_string();

        let default_action = if d.has_change(DEFAULT_ACTION) {
            Some(WafAction::new(schema::expand_default_action(d.attributes())?))
        } else {
            None
        };
        let bindings = schema::expand_rules(d.attributes())?;
        let updates = build_updates(&bindings, ChangeAction::Insert);

        info!(
            "WebAclOrch: Updating WAF Web ACL {} ({} rule(s){})",
            id,
            updates.len(),
            if default_action.is_some() {
                ", new default action"
            } else {
                ""
            }
        );
        self.send_updates(&id, default_action, updates, UPDATE_CONTEXT)?;

        self.read(d)
    }

    fn delete(&self, d: &mut ResourceData) -> Result<()> {
        let id = d.id().ok_or(WebAclError::MissingId)?.to_string();

        let bindings = schema::expand_rules(d.attributes())?;
        if !bindings.is_empty() {
            info!(
                "WebAclOrch: Removing {} rule(s) from WAF Web ACL {}",
                bindings.len(),
                id
            );
            let updates = build_updates(&bindings, ChangeAction::Delete);
            self.send_updates(&id, None, updates, DRAIN_CONTEXT)?;
        }

        info!("WebAclOrch: Deleting WAF Web ACL {}", id);
        self.retryer()
            .retry_with_token("DeleteWebACL", |token| {
                self.api.delete_web_acl(DeleteWebAclInput {
                    change_token: token.clone(),
                    web_acl_id: id.clone(),
                })
            })
            .map_err(|e| self.api_error(DELETE_CONTEXT, e))?;

        d.clear_id();
        self.bump(|s| s.acls_deleted += 1);
        Ok(())
    }
}
