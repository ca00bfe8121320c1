//! The RPC/Action Evaluator (§4.4, RFC 8341 §3.4.4).

use tracing::{debug, info, instrument};

use crate::error::{AccessDenied, NacmError};
use crate::matcher;
use crate::policy::{DefaultKind, Policy, RuleEffect};
use crate::request::{RpcRequest, Verdict};

/// Evaluate one RPC/action invocation.
#[instrument(skip(req, policy), fields(user = req.user.unwrap_or("<anonymous>"), module = req.module, operation = req.operation))]
pub fn evaluate_rpc(req: &RpcRequest, policy: &Policy) -> Result<Verdict, NacmError> {
    if !policy.enabled() {
        debug!("NACM disabled, permitting");
        return Ok(Verdict::Permit);
    }
    if let Some(user) = req.user {
        if policy.is_recovery(user) {
            debug!("recovery user, permitting");
            return Ok(Verdict::Permit);
        }
    }
    if req.operation == "close-session" {
        debug!("close-session always permitted");
        return Ok(Verdict::Permit);
    }

    let user = match req.user {
        Some(u) => u,
        None => return default_step(req, policy),
    };

    let groups = policy.groups_for(user, req.extra_groups);
    if groups.is_empty() {
        return default_step(req, policy);
    }
    let group_names: Vec<&str> = groups.iter().map(|g| g.name.as_str()).collect();

    for rule_list in policy.rule_lists() {
        if !rule_list.applies_to(&group_names) {
            continue;
        }
        for rule in &rule_list.rules {
            if matcher::rpc_rule_matches(rule, req.module, req.operation) {
                return Ok(match rule.action {
                    RuleEffect::Permit => {
                        debug!(rule = %rule.name, "rule permit");
                        Verdict::Permit
                    }
                    RuleEffect::Deny => {
                        info!(rule = %rule.name, "rule deny");
                        Verdict::Deny(AccessDenied::rule_match())
                    }
                });
            }
        }
    }

    default_step(req, policy)
}

/// §4.4 step 7: `kill-session` and `delete-config` are always denied by
/// default even when `exec-default = permit` (RFC 8341 §3.4.4), since
/// neither rule-type-any nor the default action are meant to grant them
/// implicitly.
fn default_step(req: &RpcRequest, policy: &Policy) -> Result<Verdict, NacmError> {
    if req.operation == "kill-session" || req.operation == "delete-config" {
        info!(operation = req.operation, "default deny (kill-session/delete-config)");
        return Ok(Verdict::Deny(AccessDenied::default_deny()));
    }
    match policy.default(DefaultKind::Exec)? {
        RuleEffect::Permit => Ok(Verdict::Permit),
        RuleEffect::Deny => {
            info!("default deny");
            Ok(Verdict::Deny(AccessDenied::default_deny()))
        }
    }
}
