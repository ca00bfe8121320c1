//! NACM policy data model and the "Policy View" read-only projection
//! over it (§4.1).
//!
//! `Policy` and friends are plain owned structs: the engine never
//! mutates them and never outlives the call that borrowed them (§9,
//! "Borrowed references"). [`xml`] is the one concrete loader shipped
//! with this crate; nothing in the engine depends on it.

pub mod xml;

pub use xml::load_xml;

use std::collections::HashSet;

/// Action prescribed by a matching rule, or by a `*-default` leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleEffect {
    /// Allow the requested access.
    Permit,
    /// Deny the requested access.
    Deny,
}

impl std::str::FromStr for RuleEffect {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "permit" => Ok(RuleEffect::Permit),
            "deny" => Ok(RuleEffect::Deny),
            other => Err(format!("unrecognised rule effect '{other}', expected permit|deny")),
        }
    }
}

/// The primary access mode of a request, used to match a rule's
/// `access-operations` leaf (§4.2.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Retrieving data (data-node reads).
    Read,
    /// Creating a new data-tree node.
    Create,
    /// Modifying an existing data-tree node.
    Update,
    /// Removing a data-tree node.
    Delete,
    /// Invoking an RPC/action.
    Exec,
}

impl AccessMode {
    fn token(self) -> &'static str {
        match self {
            AccessMode::Read => "read",
            AccessMode::Create => "create",
            AccessMode::Update => "update",
            AccessMode::Delete => "delete",
            AccessMode::Exec => "exec",
        }
    }

    /// Whether this mode is one of the three write variants that the
    /// `write` shorthand token also covers (§3 invariant 4).
    fn is_write_variant(self) -> bool {
        matches!(self, AccessMode::Create | AccessMode::Update | AccessMode::Delete)
    }
}

/// A rule's `access-operations` leaf, kept as the raw, lower-cased
/// token set rather than pre-expanded bits.
///
/// Matching is defined directly on the token set (§4.2.3) because the
/// `write` token is a synonym for three other tokens, not a fourth bit
/// that can be folded into them without losing the "is this rule
/// write-shaped at all" distinction the write evaluator's rule-type-any
/// branch relies on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessOps(HashSet<String>);

impl AccessOps {
    /// Parse a space-separated `access-operations` leaf. An absent leaf
    /// is represented by [`AccessOps::default`] (empty — matches
    /// nothing, per §3 invariant 4).
    pub fn parse(raw: &str) -> Self {
        AccessOps(raw.split_whitespace().map(|t| t.to_lowercase()).collect())
    }

    /// True iff no token is present — an absent `access-operations`
    /// leaf never matches any request.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Does this token set authorize `mode`? Implements §4.2.3: the
    /// primary mode token, the `write` synonym for create/update/delete,
    /// or the `*` wildcard.
    pub fn matches(&self, mode: AccessMode) -> bool {
        if self.0.is_empty() {
            return false;
        }
        if self.0.contains(mode.token()) {
            return true;
        }
        if mode.is_write_variant() && self.0.contains("write") {
            return true;
        }
        self.0.contains("*")
    }
}

/// A single NACM rule (§3). At most one of `rpc_name`, `path`,
/// `notification_name` is set; none set means "rule-type-any".
#[derive(Debug, Clone)]
pub struct Rule {
    /// Rule name, for diagnostics only — not matched on.
    pub name: String,
    /// YANG module this rule applies to. `Some("*")` means any module;
    /// `None` means the rule never matches a data-node/RPC request
    /// (§4.2.1/§4.2.2 step 1).
    pub module_name: Option<String>,
    /// RPC operation name this rule targets, if it is an RPC rule.
    pub rpc_name: Option<String>,
    /// Instance-identifier path this rule targets, if it is a data-node
    /// rule.
    pub path: Option<String>,
    /// Notification name this rule targets. Notifications are out of
    /// scope for evaluation (§1); rules bearing this field are skipped
    /// when the Preparation Cache is built (§4.3d).
    pub notification_name: Option<String>,
    /// Access-operations bit set this rule covers.
    pub access_operations: AccessOps,
    /// What to do when this rule matches.
    pub action: RuleEffect,
}

impl Rule {
    /// True iff none of `rpc_name`, `path`, `notification_name` is set
    /// — a "rule-type-any" rule (§3 invariant 3, glossary).
    pub fn is_rule_type_any(&self) -> bool {
        self.rpc_name.is_none() && self.path.is_none() && self.notification_name.is_none()
    }
}

/// A named group of user-names (§3).
#[derive(Debug, Clone)]
pub struct Group {
    /// Group name.
    pub name: String,
    /// Member user-names.
    pub users: HashSet<String>,
}

/// An ordered rule-list, applicable to a set of groups (§3).
#[derive(Debug, Clone)]
pub struct RuleList {
    /// Rule-list name, for diagnostics only.
    pub name: String,
    /// Group names this rule-list applies to. `"*"` matches any group.
    pub groups: Vec<String>,
    /// Rules in document order.
    pub rules: Vec<Rule>,
}

impl RuleList {
    /// Does this rule-list apply to a requestor who is a member of
    /// `user_groups`?
    pub fn applies_to(&self, user_groups: &[&str]) -> bool {
        self.groups.iter().any(|g| g == "*" || user_groups.contains(&g.as_str()))
    }
}

/// Which default action a [`Policy::default`] query is asking about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultKind {
    /// `read-default`.
    Read,
    /// `write-default`.
    Write,
    /// `exec-default`.
    Exec,
}

/// A fully-parsed NACM policy document (§3).
///
/// This is the "Policy" data entity; the methods below are the "Policy
/// View" component (§4.1) — a read-only projection exposing exactly the
/// queries the engine needs, without materialising any alternative
/// structure.
#[derive(Debug, Clone)]
pub struct Policy {
    /// `enable-nacm`.
    pub enable_nacm: bool,
    /// `enable-external-groups`.
    pub enable_external_groups: bool,
    /// The recovery user name, exempt from all NACM checks (§4.4 step
    /// 2, §4.5). Defaults to `"recovery"` per RFC 8341 §3.7 when the
    /// source document does not set it explicitly.
    pub recovery_user: String,
    /// `read-default`. Absent means "not configured"; the Policy View
    /// treats this as permit (§4.1).
    pub read_default: Option<RuleEffect>,
    /// `write-default`. Mandatory — [`Policy::default`] returns
    /// [`crate::error::NacmError::FatalConfig`] if this is `None`.
    pub write_default: Option<RuleEffect>,
    /// `exec-default`. Absent means "not configured"; the Policy View
    /// treats this as permit (§4.1).
    pub exec_default: Option<RuleEffect>,
    /// Groups, in document order.
    pub groups: Vec<Group>,
    /// Rule-lists, in document order (§3 invariant 1).
    pub rule_lists: Vec<RuleList>,
}

impl Policy {
    /// `enabled() → bool` (§4.1).
    pub fn enabled(&self) -> bool {
        self.enable_nacm
    }

    /// `is_recovery(user) → bool` (§4.1).
    pub fn is_recovery(&self, user: &str) -> bool {
        self.recovery_user == user
    }

    /// `default(kind) → {permit, deny}` (§4.1). `write-default` missing
    /// is a fatal configuration error; `read-default`/`exec-default`
    /// missing defaults to permit.
    pub fn default(&self, kind: DefaultKind) -> Result<RuleEffect, crate::error::NacmError> {
        match kind {
            DefaultKind::Read => Ok(self.read_default.unwrap_or(RuleEffect::Permit)),
            DefaultKind::Exec => Ok(self.exec_default.unwrap_or(RuleEffect::Permit)),
            DefaultKind::Write => self.write_default.ok_or_else(|| {
                crate::error::NacmError::fatal_config("write-default is required but absent")
            }),
        }
    }

    /// `groups_for(user) → ordered sequence of Group` (§4.1).
    ///
    /// `extra_groups` carries transport-provided group names to union in
    /// when `enable-external-groups` is true (§9 design note 4); it is
    /// ignored otherwise.
    pub fn groups_for<'a>(&'a self, user: &str, extra_groups: &[String]) -> Vec<&'a Group> {
        let mut found: Vec<&Group> = self.groups.iter().filter(|g| g.users.contains(user)).collect();
        if self.enable_external_groups {
            for extra in extra_groups {
                if !found.iter().any(|g| &g.name == extra) {
                    if let Some(g) = self.groups.iter().find(|g| &g.name == extra) {
                        found.push(g);
                    }
                }
            }
        }
        found
    }

    /// `rule_lists() → ordered sequence of RuleList` (§4.1).
    pub fn rule_lists(&self) -> &[RuleList] {
        &self.rule_lists
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_ops_wildcard_matches_everything() {
        let ops = AccessOps::parse("*");
        assert!(ops.matches(AccessMode::Read));
        assert!(ops.matches(AccessMode::Exec));
        assert!(ops.matches(AccessMode::Delete));
    }

    #[test]
    fn access_ops_write_synonym_covers_crud_but_not_read_or_exec() {
        let ops = AccessOps::parse("write");
        assert!(ops.matches(AccessMode::Create));
        assert!(ops.matches(AccessMode::Update));
        assert!(ops.matches(AccessMode::Delete));
        assert!(!ops.matches(AccessMode::Read));
        assert!(!ops.matches(AccessMode::Exec));
    }

    #[test]
    fn access_ops_no_substring_matching() {
        let ops = AccessOps::parse("read-write");
        assert!(!ops.matches(AccessMode::Read));
    }

    #[test]
    fn access_ops_empty_matches_nothing() {
        let ops = AccessOps::default();
        assert!(!ops.matches(AccessMode::Read));
    }

    #[test]
    fn write_default_missing_is_fatal() {
        let policy = Policy {
            enable_nacm: true,
            enable_external_groups: false,
            recovery_user: "recovery".into(),
            read_default: None,
            write_default: None,
            exec_default: None,
            groups: vec![],
            rule_lists: vec![],
        };
        assert!(policy.default(DefaultKind::Write).is_err());
        assert_eq!(policy.default(DefaultKind::Read).unwrap(), RuleEffect::Permit);
    }

    #[test]
    fn groups_for_unions_external_groups_when_enabled() {
        let mut groups = vec![
            Group { name: "local".into(), users: ["alice".to_string()].into_iter().collect() },
            Group { name: "radius".into(), users: HashSet::new() },
        ];
        groups[1].users.clear();
        let policy = Policy {
            enable_nacm: true,
            enable_external_groups: true,
            recovery_user: "recovery".into(),
            read_default: None,
            write_default: Some(RuleEffect::Deny),
            exec_default: None,
            groups,
            rule_lists: vec![],
        };
        let found = policy.groups_for("alice", &["radius".to_string()]);
        let names: Vec<&str> = found.iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["local", "radius"]);
    }
}
