//! The Write Evaluator (§4.5, RFC 8341 §3.4.5 write path).

use tracing::{debug, info, instrument};

use crate::cache::{self, CacheEntry};
use crate::error::{AccessDenied, NacmError};
use crate::matcher;
use crate::policy::{DefaultKind, Policy, RuleEffect};
use crate::request::{Verdict, WriteAccess};
use crate::tree::{DataTree, Schema};

/// Evaluate a create/update/delete request against `requested_root` and
/// everything beneath it.
///
/// `full_tree_root` is the data tree's actual top-level node — distinct
/// from `requested_root` whenever the write target is anywhere below
/// the root — and is what rule paths are resolved against (§3: `Write`
/// takes both the requested subtree root and the full configuration
/// tree). Passing `requested_root` itself as the resolution anchor
/// would make any rule whose path names an ancestor of the write target
/// un-resolvable, silently dropping it from the cache.
///
/// Descendant-deny semantics (§4.5, §8 P6): a deny anywhere in the
/// subtree aborts the whole write immediately; nothing below this
/// function's entry ever mutates the tree, so a `Deny` verdict leaves
/// it unchanged (§8 P7).
#[instrument(skip(tree, schema, policy), fields(user = user.unwrap_or("<anonymous>")))]
pub fn evaluate_write<T, S>(
    tree: &T,
    schema: &S,
    access: WriteAccess,
    full_tree_root: &T::Node,
    requested_root: &T::Node,
    user: Option<&str>,
    extra_groups: &[String],
    policy: &Policy,
) -> Result<Verdict, NacmError>
where
    T: DataTree,
    S: Schema<Node = T::Node>,
{
    if !policy.enabled() {
        debug!("NACM disabled, permitting");
        return Ok(Verdict::Permit);
    }
    if let Some(u) = user {
        if policy.is_recovery(u) {
            debug!("recovery user, permitting");
            return Ok(Verdict::Permit);
        }
    }

    let write_default = policy.default(DefaultKind::Write)?;

    let group_names: Vec<String> = match user {
        Some(u) => policy.groups_for(u, extra_groups).into_iter().map(|g| g.name.clone()).collect(),
        None => Vec::new(),
    };

    let cache: Vec<CacheEntry<T::Node>> = if group_names.is_empty() {
        Vec::new()
    } else {
        let refs: Vec<&str> = group_names.iter().map(String::as_str).collect();
        cache::build(tree, schema, policy, &refs, access.as_access_mode(), full_tree_root)?
    };

    match visit(tree, schema, &cache, write_default, access, requested_root)? {
        Some(denied) => {
            info!(reason = %denied.message, "write denied");
            Ok(Verdict::Deny(denied))
        }
        None => {
            debug!("write permitted");
            Ok(Verdict::Permit)
        }
    }
}

/// Depth-first write check over `node` and its element children.
///
/// Returns `Ok(Some(denied))` the instant any node in the subtree is
/// denied (aborting the remaining traversal — §4.5 descendant-deny),
/// or `Ok(None)` if the whole subtree is permitted.
fn visit<T, S>(
    tree: &T,
    schema: &S,
    cache: &[CacheEntry<T::Node>],
    write_default: RuleEffect,
    access: WriteAccess,
    node: &T::Node,
) -> Result<Option<AccessDenied>, NacmError>
where
    T: DataTree,
    S: Schema<Node = T::Node>,
{
    let mode = access.as_access_mode();
    let mut matched = None;
    for entry in cache {
        if matcher::data_node_rule_matches(tree, schema, entry.rule, &entry.nodes, node, mode)? {
            matched = Some(entry.rule.action);
            break;
        }
    }

    let permitted = match matched {
        Some(RuleEffect::Deny) => return Ok(Some(AccessDenied::rule_match())),
        Some(RuleEffect::Permit) => true,
        None => match write_default {
            RuleEffect::Deny => return Ok(Some(AccessDenied::default_deny())),
            RuleEffect::Permit => true,
        },
    };
    debug_assert!(permitted);

    for child in tree.children(node) {
        if let Some(denied) = visit(tree, schema, cache, write_default, access, &child)? {
            return Ok(Some(denied));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AccessOps, Group, Rule, RuleList};
    use crate::tree::memory::{MemorySchema, Tree};
    use std::collections::HashSet;

    fn rule(path: Option<&str>, ops: &str, action: RuleEffect) -> Rule {
        Rule {
            name: "r".into(),
            module_name: Some("*".into()),
            rpc_name: None,
            path: path.map(String::from),
            notification_name: None,
            access_operations: AccessOps::parse(ops),
            action,
        }
    }

    fn policy(write_default: RuleEffect, rules: Vec<Rule>) -> Policy {
        Policy {
            enable_nacm: true,
            enable_external_groups: false,
            recovery_user: "recovery".into(),
            read_default: None,
            write_default: Some(write_default),
            exec_default: None,
            groups: vec![Group { name: "g".into(), users: HashSet::from(["u".to_string()]) }],
            rule_lists: vec![RuleList { name: "rl".into(), groups: vec!["g".into()], rules }],
        }
    }

    /// S4: write denied by an ancestor rule.
    #[test]
    fn ancestor_deny_blocks_descendant_write() {
        let mut tree = Tree::new("a");
        let root = tree.root();
        let b = tree.add_child(root, "b");
        let c = tree.add_child(b, "c");
        let schema = MemorySchema::new("m");
        let policy = policy(RuleEffect::Permit, vec![rule(Some("/a"), "write", RuleEffect::Deny)]);

        let verdict =
            evaluate_write(&tree, &schema, WriteAccess::Create, &root, &c, Some("u"), &[], &policy).unwrap();
        assert!(matches!(verdict, Verdict::Deny(_)));
    }

    #[test]
    fn default_deny_with_no_matching_rule() {
        let tree = Tree::new("a");
        let root = tree.root();
        let schema = MemorySchema::new("m");
        let policy = policy(RuleEffect::Deny, vec![]);
        let verdict =
            evaluate_write(&tree, &schema, WriteAccess::Update, &root, &root, Some("u"), &[], &policy).unwrap();
        assert_eq!(verdict, Verdict::Deny(AccessDenied::default_deny()));
    }

    #[test]
    fn permit_rule_allows_recursion_into_children() {
        let mut tree = Tree::new("a");
        let root = tree.root();
        let b = tree.add_child(root, "b");
        let _c = tree.add_child(b, "c");
        let schema = MemorySchema::new("m");
        let policy = policy(RuleEffect::Deny, vec![rule(Some("/a"), "write", RuleEffect::Permit)]);
        let verdict =
            evaluate_write(&tree, &schema, WriteAccess::Create, &root, &root, Some("u"), &[], &policy).unwrap();
        assert_eq!(verdict, Verdict::Permit);
    }

    #[test]
    fn missing_write_default_is_fatal_config() {
        let tree = Tree::new("a");
        let root = tree.root();
        let schema = MemorySchema::new("m");
        let mut policy = policy(RuleEffect::Deny, vec![]);
        policy.write_default = None;
        let result = evaluate_write(&tree, &schema, WriteAccess::Create, &root, &root, Some("u"), &[], &policy);
        assert!(matches!(result, Err(NacmError::FatalConfig(_))));
    }

    #[test]
    fn disabled_nacm_permits_unconditionally() {
        let tree = Tree::new("a");
        let root = tree.root();
        let schema = MemorySchema::new("m");
        let mut policy = policy(RuleEffect::Deny, vec![rule(Some("/a"), "write", RuleEffect::Deny)]);
        policy.enable_nacm = false;
        let verdict =
            evaluate_write(&tree, &schema, WriteAccess::Create, &root, &root, Some("u"), &[], &policy).unwrap();
        assert_eq!(verdict, Verdict::Permit);
    }
}
