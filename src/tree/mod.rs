//! The data-tree and schema collaborator contracts (§6).
//!
//! These are external interfaces: the engine is generic over whatever
//! data-tree/schema library the host embeds, via the [`DataTree`] and
//! [`Schema`] traits. [`memory`] ships one concrete, in-process
//! implementation used by the CLI, the examples, and this crate's own
//! tests — it is a reference, not a replacement for a host's real
//! YANG-aware store.

pub mod memory;

use crate::error::CollaboratorError;

/// Per-node flags the read evaluator uses to record permit/deny
/// decisions before pruning (§4.6, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeFlag {
    /// Node (or an ancestor-preserving descendant) was explicitly
    /// permitted; survives a `read-default = deny` prune.
    Mark,
    /// Node was explicitly denied; never recursed into, detached once
    /// its parent finishes visiting it.
    Delete,
}

/// A namespace context: prefix → namespace URI, used when canonicalising
/// a rule's `path` leaf against the node it was declared in (§6).
pub type NsContext = std::collections::HashMap<String, String>;

/// The schema registry collaborator (§6): module lookup by node.
pub trait Schema {
    /// Concrete node handle type of the paired [`DataTree`] implementation.
    type Node;
    /// Opaque handle to a YANG module.
    type Module;

    /// `module_of(node) → Module`.
    fn module_of(&self, node: &Self::Node) -> Result<Self::Module, CollaboratorError>;

    /// `module_name(Module) → string`.
    fn module_name(&self, module: &Self::Module) -> String;

    /// Convenience: the module name of `node` directly.
    fn module_name_of(&self, node: &Self::Node) -> Result<String, CollaboratorError> {
        let module = self.module_of(node)?;
        Ok(self.module_name(&module))
    }
}

/// The data-tree collaborator (§6): navigation, flags, and the
/// path/xpath resolution primitives the Preparation Cache needs.
pub trait DataTree {
    /// Opaque node handle. Cheap to clone (an index or pointer, not a
    /// deep copy of subtree content).
    type Node: Clone + PartialEq;

    /// `find_child_body(node, name) → string?`.
    fn find_child_body(&self, node: &Self::Node, name: &str) -> Option<String>;

    /// `find_child_element(node, name) → node?`.
    fn find_child_element(&self, node: &Self::Node, name: &str) -> Option<Self::Node>;

    /// `children(node) → iterator<node>`, element children in document
    /// order.
    fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

    /// `is_ancestor(n, candidate_ancestor) → bool`.
    fn is_ancestor(&self, candidate_ancestor: &Self::Node, n: &Self::Node) -> bool;

    /// `detach(node)` — remove from parent and free.
    fn detach(&mut self, node: &Self::Node);

    /// `set_flag(node, flag)`.
    fn set_flag(&mut self, node: &Self::Node, flag: NodeFlag);

    /// `clear_flag(node, flag)`.
    fn clear_flag(&mut self, node: &Self::Node, flag: NodeFlag);

    /// Is `flag` currently set on `node`?
    fn has_flag(&self, node: &Self::Node, flag: NodeFlag) -> bool;

    /// `canonicalise_path(path, local_nsctx, schema) → canonical_path`.
    ///
    /// The reference tree's paths are already plain, unprefixed,
    /// slash-separated element-name paths (e.g. `/interfaces/interface`),
    /// so canonicalisation here is limited to trimming and requiring a
    /// leading slash; a host with real namespace-prefixed paths would
    /// resolve prefixes against `local_nsctx` and the schema here
    /// instead.
    fn canonicalise_path(&self, path: &str, local_nsctx: &NsContext) -> Result<String, CollaboratorError>;

    /// `resolve_instance_id(root, schema, path) → sequence<node>`.
    ///
    /// Resolves a canonical path against `root`, returning every
    /// matching node. An instance identifier without list-key
    /// predicates matches every sibling sharing that element name at
    /// each step, which is the behavior the reference tree implements
    /// (predicates are not part of this crate's path grammar).
    fn resolve_instance_id(&self, root: &Self::Node, path: &str) -> Result<Vec<Self::Node>, CollaboratorError>;

    /// `evaluate_xpath(root, nsctx, fmt, …) → sequence<node>`.
    ///
    /// The reference tree treats this identically to
    /// [`DataTree::resolve_instance_id`] — real XPath evaluation (with
    /// predicates, functions, unions) is firmly out of scope for this
    /// crate (§1) and belongs to the host's own data-tree library.
    fn evaluate_xpath(&self, root: &Self::Node, nsctx: &NsContext, expr: &str) -> Result<Vec<Self::Node>, CollaboratorError> {
        self.resolve_instance_id(root, expr)
    }

    /// Default implementation of `prune_unmarked(root, MARK_FLAG)`:
    /// recursively removes every child subtree of `root` that is not
    /// itself [`NodeFlag::Mark`]-ed and contains no marked descendant.
    /// `root` itself is never detached by this call — callers prune a
    /// requested root's *contents*, not the root itself (§4.6, S6).
    fn prune_unmarked(&mut self, root: &Self::Node) {
        for child in self.children(root) {
            let keep = self.prune_unmarked_recursive(&child);
            if !keep {
                self.detach(&child);
            }
        }
    }

    /// Returns true if `node` should be kept (it is marked, or some
    /// descendant is marked after recursively pruning unmarked ones).
    fn prune_unmarked_recursive(&mut self, node: &Self::Node) -> bool {
        let mut any_marked_descendant = false;
        for child in self.children(node) {
            let keep = self.prune_unmarked_recursive(&child);
            if keep {
                any_marked_descendant = true;
            } else {
                self.detach(&child);
            }
        }
        self.has_flag(node, NodeFlag::Mark) || any_marked_descendant
    }
}
