//! The Preparation Cache (§4.3): per-request precomputation that turns
//! the (group-filtered, access-filtered) rules into a flat, ordered
//! list paired with their pre-resolved target node sets, so the write
//! and read evaluators do a linear scan per node instead of repeating
//! path resolution.

use crate::error::NacmError;
use crate::policy::{AccessMode, Policy, Rule};
use crate::tree::{DataTree, NsContext, Schema};

/// One cache entry: a rule and the concrete nodes its `path` resolved
/// to. An empty node set means the rule is rule-type-any (no `path` at
/// all) — a path rule that resolved to nothing is dropped instead of
/// kept with an empty set (§4.3b).
pub struct CacheEntry<'r, N> {
    /// The rule this entry was built from.
    pub rule: &'r Rule,
    /// Pre-resolved target nodes, or empty for rule-type-any.
    pub nodes: Vec<N>,
}

/// Build the Preparation Cache for one data-node access request.
///
/// `user_groups` must already be group *names*, not [`crate::policy::Group`]
/// values — callers typically get these from [`Policy::groups_for`] and
/// map to `.name`.
pub fn build<'r, T, S>(
    tree: &T,
    schema: &S,
    policy: &'r Policy,
    user_groups: &[&str],
    mode: AccessMode,
    full_tree_root: &T::Node,
) -> Result<Vec<CacheEntry<'r, T::Node>>, NacmError>
where
    T: DataTree,
    S: Schema<Node = T::Node>,
{
    let _ = schema; // module resolution happens at match time, not prepare time (§4.2.2)
    let mut cache = Vec::new();
    let empty_nsctx = NsContext::new();

    for rule_list in policy.rule_lists() {
        if !rule_list.applies_to(user_groups) {
            continue;
        }
        for rule in &rule_list.rules {
            if !rule.access_operations.matches(mode) {
                continue;
            }
            if rule.rpc_name.is_some() || rule.notification_name.is_some() {
                // §4.3d: rpc/notification-typed rules never target data nodes.
                continue;
            }
            match &rule.path {
                Some(path) => {
                    let canonical = tree.canonicalise_path(path, &empty_nsctx)?;
                    let nodes = tree.resolve_instance_id(full_tree_root, &canonical)?;
                    if nodes.is_empty() {
                        continue;
                    }
                    cache.push(CacheEntry { rule, nodes });
                }
                None => {
                    // rule-type-any: no rpc_name/notification_name (filtered above),
                    // no path — matches any node of a compatible access mode.
                    cache.push(CacheEntry { rule, nodes: Vec::new() });
                }
            }
        }
    }

    Ok(cache)
}
