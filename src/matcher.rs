//! The Rule Matcher (§4.2): decides whether one rule matches one
//! request, for either the RPC shape (§4.2.1) or the data-node shape
//! (§4.2.2). Both share the `access-operations` token semantics of
//! §4.2.3, implemented on [`crate::policy::AccessOps`].

use crate::error::NacmError;
use crate::policy::{AccessMode, Rule};
use crate::tree::{DataTree, Schema};

/// RPC matching (§4.2.1, RFC 8341 §3.4.4 step 7).
///
/// Rules whose rule-type is `path` or `notification-name` never match
/// an RPC request (wrong rule-type).
pub fn rpc_rule_matches(rule: &Rule, module: &str, operation: &str) -> bool {
    let module_matches = match rule.module_name.as_deref() {
        Some("*") => true,
        Some(m) => m == module,
        None => false,
    };
    if !module_matches {
        return false;
    }

    let rpc_name_matches = if rule.path.is_some() || rule.notification_name.is_some() {
        false
    } else {
        match rule.rpc_name.as_deref() {
            None => true,
            Some("*") => true,
            Some(name) => name == operation,
        }
    };
    if !rpc_name_matches {
        return false;
    }

    rule.access_operations.matches(AccessMode::Exec)
}

/// Data-node matching (§4.2.2, RFC 8341 §3.4.5 step 6).
///
/// `paths` is the pre-evaluated node set for `rule` produced by the
/// Preparation Cache (§4.3) — empty for a rule-type-any rule, non-empty
/// for a rule with a `path`. Rules with `rpc-name`/`notification-name`
/// must already have been excluded by the cache (§4.3d); this function
/// still returns `false` for them defensively.
pub fn data_node_rule_matches<T, S>(
    tree: &T,
    schema: &S,
    rule: &Rule,
    paths: &[T::Node],
    node: &T::Node,
    mode: AccessMode,
) -> Result<bool, NacmError>
where
    T: DataTree,
    S: Schema<Node = T::Node>,
{
    if !rule.access_operations.matches(mode) {
        return Ok(false);
    }

    let module_matches = match rule.module_name.as_deref() {
        Some("*") => true,
        Some(m) => schema.module_name_of(node)? == m,
        None => false,
    };
    if !module_matches {
        return Ok(false);
    }

    let path_matches = if rule.path.is_none() {
        rule.is_rule_type_any()
    } else {
        paths.iter().any(|p| p == node || tree.is_ancestor(p, node))
    };

    Ok(path_matches)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::{AccessOps, RuleEffect};
    use crate::tree::memory::{MemorySchema, Tree};

    fn rule(module: Option<&str>, rpc: Option<&str>, path: Option<&str>, ops: &str, action: RuleEffect) -> Rule {
        Rule {
            name: "r".into(),
            module_name: module.map(String::from),
            rpc_name: rpc.map(String::from),
            path: path.map(String::from),
            notification_name: None,
            access_operations: AccessOps::parse(ops),
            action,
        }
    }

    #[test]
    fn rpc_wildcard_module_and_name_match() {
        let r = rule(Some("*"), Some("*"), None, "exec", RuleEffect::Permit);
        assert!(rpc_rule_matches(&r, "any-module", "any-op"));
    }

    #[test]
    fn rpc_rule_requires_exec_access() {
        let r = rule(Some("*"), Some("get-config"), None, "read", RuleEffect::Permit);
        assert!(!rpc_rule_matches(&r, "m", "get-config"));
    }

    #[test]
    fn rpc_rule_with_path_never_matches_rpc() {
        let r = rule(Some("*"), None, Some("/a"), "exec", RuleEffect::Permit);
        assert!(!rpc_rule_matches(&r, "m", "whatever"));
    }

    #[test]
    fn data_node_rule_type_any_matches_anything_of_right_module_and_op() {
        let tree = Tree::new("r");
        let schema = MemorySchema::new("m");
        let r = rule(Some("*"), None, None, "read", RuleEffect::Permit);
        let matched = data_node_rule_matches(&tree, &schema, &r, &[], &tree.root(), AccessMode::Read).unwrap();
        assert!(matched);
    }

    #[test]
    fn data_node_rule_matches_descendant_of_path_target() {
        let mut tree = Tree::new("r");
        let root = tree.root();
        let a = tree.add_child(root, "a");
        let b = tree.add_child(a, "b");
        let schema = MemorySchema::new("m");
        let r = rule(Some("*"), None, Some("/r/a"), "read", RuleEffect::Deny);
        let matched = data_node_rule_matches(&tree, &schema, &r, &[a], &b, AccessMode::Read).unwrap();
        assert!(matched);
    }

    #[test]
    fn data_node_rule_requires_module_match() {
        let tree = Tree::new("r");
        let mut schema = MemorySchema::new("default");
        schema.set_module(tree.root(), "other-module");
        let r = rule(Some("default"), None, None, "read", RuleEffect::Permit);
        let matched = data_node_rule_matches(&tree, &schema, &r, &[], &tree.root(), AccessMode::Read).unwrap();
        assert!(!matched);
    }
}
