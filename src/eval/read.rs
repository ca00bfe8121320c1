//! The Read Evaluator (§4.6, RFC 8341 §3.4.5 read variant).

use tracing::{debug, instrument};

use crate::cache::{self, CacheEntry};
use crate::matcher;
use crate::policy::{DefaultKind, Policy, RuleEffect};
use crate::error::NacmError;
use crate::policy::AccessMode;
use crate::tree::{DataTree, NodeFlag, Schema};

/// Evaluate a read request, mutating the tree in place: every node
/// under each of `requested_roots` that the policy denies is detached.
///
/// `full_tree_root` is the data tree's actual top-level node, distinct
/// from `requested_roots` whenever a requested root sits below it, and
/// is what rule paths are resolved against (§3: `Read` takes the full
/// configuration tree plus the requested subtree roots). Resolving
/// paths against a requested root that isn't the true root would make
/// any rule naming one of its ancestors un-resolvable.
///
/// Reads never surface a deny to the caller (§4.6) — there is no
/// `Verdict` here, only the pruned tree. If the user has no groups at
/// all, no rule could ever have permitted anything, so every requested
/// root is removed outright without running the traversal (§4.6).
#[instrument(skip(tree, schema, policy, requested_roots), fields(user = user.unwrap_or("<anonymous>")))]
pub fn evaluate_read<T, S>(
    tree: &mut T,
    schema: &S,
    full_tree_root: &T::Node,
    requested_roots: &[T::Node],
    user: Option<&str>,
    extra_groups: &[String],
    policy: &Policy,
) -> Result<(), NacmError>
where
    T: DataTree,
    S: Schema<Node = T::Node>,
{
    if !policy.enabled() {
        debug!("NACM disabled, permitting");
        return Ok(());
    }
    if let Some(u) = user {
        if policy.is_recovery(u) {
            debug!("recovery user, permitting");
            return Ok(());
        }
    }

    let group_names: Vec<String> = match user {
        Some(u) => policy.groups_for(u, extra_groups).into_iter().map(|g| g.name.clone()).collect(),
        None => Vec::new(),
    };
    if group_names.is_empty() {
        debug!("requestor has no groups, removing every requested root");
        for root in requested_roots {
            tree.detach(root);
        }
        return Ok(());
    }
    let refs: Vec<&str> = group_names.iter().map(String::as_str).collect();

    let read_default = policy.default(DefaultKind::Read)?;

    for root in requested_roots {
        let cache = cache::build(tree, schema, policy, &refs, AccessMode::Read, full_tree_root)?;
        flag_subtree(tree, schema, &cache, root)?;
        sweep_deleted(tree, root);
        if read_default == RuleEffect::Deny {
            tree.prune_unmarked(root);
        }
        clear_marks(tree, root);
    }
    Ok(())
}

/// Depth-first flagging pass (§4.6 per-node rule scan + traversal).
/// Does not recurse into a node once it is flagged DELETE.
fn flag_subtree<T, S>(
    tree: &mut T,
    schema: &S,
    cache: &[CacheEntry<T::Node>],
    node: &T::Node,
) -> Result<(), NacmError>
where
    T: DataTree,
    S: Schema<Node = T::Node>,
{
    let mut matched = None;
    for entry in cache {
        if matcher::data_node_rule_matches(tree, schema, entry.rule, &entry.nodes, node, AccessMode::Read)? {
            matched = Some(entry.rule.action);
            break;
        }
    }
    match matched {
        Some(RuleEffect::Deny) => {
            tree.set_flag(node, NodeFlag::Delete);
            return Ok(());
        }
        Some(RuleEffect::Permit) => tree.set_flag(node, NodeFlag::Mark),
        None => {}
    }
    for child in tree.children(node) {
        flag_subtree(tree, schema, cache, &child)?;
    }
    Ok(())
}

/// Detach every direct child flagged DELETE, after its own subtree has
/// already been flagged (§4.6: "after recursion, if a child is flagged
/// DELETE, detach it immediately").
fn sweep_deleted<T: DataTree>(tree: &mut T, node: &T::Node) {
    for child in tree.children(node) {
        sweep_deleted(tree, &child);
        if tree.has_flag(&child, NodeFlag::Delete) {
            tree.detach(&child);
        }
    }
}

/// Clear every MARK flag left over from the flagging pass (§4.6:
/// "finally, clear MARK flags from the tree").
fn clear_marks<T: DataTree>(tree: &mut T, node: &T::Node) {
    tree.clear_flag(node, NodeFlag::Mark);
    for child in tree.children(node) {
        clear_marks(tree, &child);
    }
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

    fn policy(read_default: RuleEffect, rules: Vec<Rule>) -> Policy {
        Policy {
            enable_nacm: true,
            enable_external_groups: false,
            recovery_user: "recovery".into(),
            read_default: Some(read_default),
            write_default: Some(RuleEffect::Deny),
            exec_default: None,
            groups: vec![Group { name: "g".into(), users: HashSet::from(["u".to_string()]) }],
            rule_lists: vec![RuleList { name: "rl".into(), groups: vec!["g".into()], rules }],
        }
    }

    /// S6: read-default permit, a deny on a middle node removes it and
    /// everything below it, but its sibling and the requested root survive.
    #[test]
    fn permit_default_prunes_only_denied_subtree() {
        let mut tree = Tree::new("r");
        let root = tree.root();
        let x = tree.add_child(root, "x");
        let y = tree.add_child(root, "y");
        let _z = tree.add_child(y, "z");
        let schema = MemorySchema::new("m");
        let policy = policy(RuleEffect::Permit, vec![rule(Some("/r/y"), "read", RuleEffect::Deny)]);

        evaluate_read(&mut tree, &schema, &root, &[root], Some("u"), &[], &policy).unwrap();

        let children = tree.children(&root);
        assert!(children.contains(&x));
        assert!(!children.contains(&y));
    }

    #[test]
    fn deny_default_keeps_only_marked_ancestor_chain() {
        let mut tree = Tree::new("r");
        let root = tree.root();
        let x = tree.add_child(root, "x");
        let y = tree.add_child(root, "y");
        let z = tree.add_child(y, "z");
        let schema = MemorySchema::new("m");
        let policy = policy(RuleEffect::Deny, vec![rule(Some("/r/y/z"), "read", RuleEffect::Permit)]);

        evaluate_read(&mut tree, &schema, &root, &[root], Some("u"), &[], &policy).unwrap();

        let children = tree.children(&root);
        assert!(!children.contains(&x));
        assert!(children.contains(&y));
        assert!(tree.children(&y).contains(&z));
    }

    #[test]
    fn no_groups_removes_requested_root() {
        let mut tree = Tree::new("r");
        let root = tree.root();
        let x = tree.add_child(root, "x");
        let schema = MemorySchema::new("m");
        let policy = policy(RuleEffect::Permit, vec![]);

        evaluate_read(&mut tree, &schema, &root, &[x], Some("stranger"), &[], &policy).unwrap();

        assert!(tree.children(&root).is_empty());
    }

    #[test]
    fn mark_flags_do_not_leak_past_evaluation() {
        let mut tree = Tree::new("r");
        let root = tree.root();
        let x = tree.add_child(root, "x");
        let schema = MemorySchema::new("m");
        let policy = policy(RuleEffect::Deny, vec![rule(Some("/r/x"), "read", RuleEffect::Permit)]);

        evaluate_read(&mut tree, &schema, &root, &[root], Some("u"), &[], &policy).unwrap();

        assert!(!tree.has_flag(&x, NodeFlag::Mark));
    }

    #[test]
    fn disabled_nacm_leaves_tree_untouched() {
        let mut tree = Tree::new("r");
        let root = tree.root();
        tree.add_child(root, "x");
        let schema = MemorySchema::new("m");
        let mut policy = policy(RuleEffect::Deny, vec![]);
        policy.enable_nacm = false;

        evaluate_read(&mut tree, &schema, &root, &[root], Some("u"), &[], &policy).unwrap();

        assert_eq!(tree.children(&root).len(), 1);
    }
}
