//! A small in-memory arena tree implementing [`DataTree`] + [`Schema`].
//!
//! This is the reference data-tree collaborator used by the CLI, the
//! bundled examples, and this crate's own test suite. It is
//! deliberately minimal — plain unprefixed element names, no list keys,
//! no real XPath — because the actual data-tree and schema libraries
//! are out of scope for this crate (§1, §6): a host embeds its own.

use std::collections::{HashMap, HashSet};

use super::{DataTree, NodeFlag, NsContext, Schema};
use crate::error::CollaboratorError;

/// Handle into a [`Tree`]'s arena. Cheap to copy; meaningless outside
/// the `Tree` that issued it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct NodeData {
    name: String,
    body: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    flags: HashSet<NodeFlag>,
}

/// A mutable, arena-backed element tree: the reference `DataTree`
/// implementation.
#[derive(Debug, Clone)]
pub struct Tree {
    arena: Vec<NodeData>,
    root: NodeId,
}

impl Tree {
    /// Create a tree with a single root element named `root_name`.
    pub fn new(root_name: impl Into<String>) -> Self {
        let root_data =
            NodeData { name: root_name.into(), body: None, parent: None, children: Vec::new(), flags: HashSet::new() };
        Tree { arena: vec![root_data], root: NodeId(0) }
    }

    /// The tree's root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Append a new, empty element child named `name` under `parent`.
    pub fn add_child(&mut self, parent: NodeId, name: impl Into<String>) -> NodeId {
        let id = NodeId(self.arena.len());
        self.arena.push(NodeData { name: name.into(), body: None, parent: Some(parent), children: Vec::new(), flags: HashSet::new() });
        self.arena[parent.0].children.push(id);
        id
    }

    /// Append a new leaf element child named `name` holding `body` text.
    pub fn add_leaf(&mut self, parent: NodeId, name: impl Into<String>, body: impl Into<String>) -> NodeId {
        let id = self.add_child(parent, name);
        self.arena[id.0].body = Some(body.into());
        id
    }

    /// The element name (tag) of `node`.
    pub fn name(&self, node: NodeId) -> &str {
        &self.arena[node.0].name
    }

    /// The body text of `node`, if any.
    pub fn body(&self, node: NodeId) -> Option<&str> {
        self.arena[node.0].body.as_deref()
    }

    /// Render the subtree rooted at `node` as a compact, deterministic
    /// s-expression-like string, useful for test assertions and CLI
    /// debug output (e.g. `(r (x) (y (z)))`).
    pub fn render(&self, node: NodeId) -> String {
        let data = &self.arena[node.0];
        if data.children.is_empty() {
            match &data.body {
                Some(body) => format!("({} {body})", data.name),
                None => format!("({})", data.name),
            }
        } else {
            let inner: Vec<String> = data.children.iter().map(|c| self.render(*c)).collect();
            format!("({} {})", data.name, inner.join(" "))
        }
    }
}

impl DataTree for Tree {
    type Node = NodeId;

    fn find_child_body(&self, node: &NodeId, name: &str) -> Option<String> {
        self.find_child_element(node, name).and_then(|c| self.body(c)).map(|s| s.to_string())
    }

    fn find_child_element(&self, node: &NodeId, name: &str) -> Option<NodeId> {
        self.arena[node.0].children.iter().copied().find(|c| self.name(*c) == name)
    }

    fn children(&self, node: &NodeId) -> Vec<NodeId> {
        self.arena[node.0].children.clone()
    }

    fn is_ancestor(&self, candidate_ancestor: &NodeId, n: &NodeId) -> bool {
        let mut cur = self.arena[n.0].parent;
        while let Some(p) = cur {
            if p == *candidate_ancestor {
                return true;
            }
            cur = self.arena[p.0].parent;
        }
        false
    }

    fn detach(&mut self, node: &NodeId) {
        if let Some(parent) = self.arena[node.0].parent.take() {
            self.arena[parent.0].children.retain(|c| c != node);
        }
    }

    fn set_flag(&mut self, node: &NodeId, flag: NodeFlag) {
        self.arena[node.0].flags.insert(flag);
    }

    fn clear_flag(&mut self, node: &NodeId, flag: NodeFlag) {
        self.arena[node.0].flags.remove(&flag);
    }

    fn has_flag(&self, node: &NodeId, flag: NodeFlag) -> bool {
        self.arena[node.0].flags.contains(&flag)
    }

    fn canonicalise_path(&self, path: &str, _local_nsctx: &NsContext) -> Result<String, CollaboratorError> {
        let trimmed = path.trim();
        if !trimmed.starts_with('/') {
            return Err(CollaboratorError::msg(format!("path '{trimmed}' is not absolute")));
        }
        Ok(trimmed.trim_end_matches('/').to_string())
    }

    fn resolve_instance_id(&self, root: &NodeId, path: &str) -> Result<Vec<NodeId>, CollaboratorError> {
        let segments: Vec<&str> = path.trim_start_matches('/').split('/').filter(|s| !s.is_empty()).collect();
        if segments.is_empty() {
            return Ok(vec![]);
        }
        if segments[0] != self.name(*root) {
            return Ok(vec![]);
        }
        let mut current = vec![*root];
        for seg in &segments[1..] {
            let mut next = Vec::new();
            for node in &current {
                for child in self.children(node) {
                    if self.name(child) == *seg {
                        next.push(child);
                    }
                }
            }
            current = next;
            if current.is_empty() {
                break;
            }
        }
        Ok(current)
    }
}

/// Module registry paired with a [`Tree`]: every node belongs to
/// `default_module` unless it (or an ancestor the caller recorded) has
/// an explicit override.
#[derive(Debug, Clone, Default)]
pub struct MemorySchema {
    default_module: String,
    overrides: HashMap<NodeId, String>,
}

impl MemorySchema {
    /// Create a schema where every node belongs to `default_module`
    /// unless overridden.
    pub fn new(default_module: impl Into<String>) -> Self {
        MemorySchema { default_module: default_module.into(), overrides: HashMap::new() }
    }

    /// Record that `node` (and, by `module_of`'s lookup, anything under
    /// it that isn't itself overridden) belongs to `module`.
    pub fn set_module(&mut self, node: NodeId, module: impl Into<String>) {
        self.overrides.insert(node, module.into());
    }
}

impl Schema for MemorySchema {
    type Node = NodeId;
    type Module = String;

    fn module_of(&self, node: &NodeId) -> Result<String, CollaboratorError> {
        Ok(self.overrides.get(node).cloned().unwrap_or_else(|| self.default_module.clone()))
    }

    fn module_name(&self, module: &String) -> String {
        module.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeId, NodeId, NodeId) {
        let mut tree = Tree::new("r");
        let root = tree.root();
        let x = tree.add_child(root, "x");
        let y = tree.add_child(root, "y");
        let z = tree.add_child(y, "z");
        let _ = z;
        (tree, root, x, y)
    }

    #[test]
    fn is_ancestor_walks_parent_chain() {
        let (tree, root, x, y) = sample();
        assert!(tree.is_ancestor(&root, &x));
        assert!(tree.is_ancestor(&root, &y));
        assert!(!tree.is_ancestor(&x, &y));
    }

    #[test]
    fn resolve_instance_id_matches_path_including_root_tag() {
        let (tree, root, x, _y) = sample();
        let hits = tree.resolve_instance_id(&root, "/r/x").unwrap();
        assert_eq!(hits, vec![x]);
        let none = tree.resolve_instance_id(&root, "/other/x").unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn detach_removes_from_parent_children() {
        let (mut tree, root, x, _y) = sample();
        tree.detach(&x);
        assert!(!tree.children(&root).contains(&x));
    }

    #[test]
    fn prune_unmarked_keeps_subtrees_with_marked_descendants() {
        let (mut tree, root, x, y) = sample();
        tree.set_flag(&x, NodeFlag::Mark);
        tree.prune_unmarked(&root);
        assert!(tree.children(&root).contains(&x));
        assert!(!tree.children(&root).contains(&y));
    }
}
