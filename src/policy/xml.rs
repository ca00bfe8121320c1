//! NACM XML policy loader (§4.7).
//!
//! Parses the `<config><nacm>…</nacm></config>` document shape into a
//! [`Policy`](super::Policy). This mirrors the wire format the
//! `nacm-validator` prototype this crate grows out of already
//! understood, extended with `notification-name` on `<rule>` and an
//! optional `<recovery-user>` leaf.
//!
//! This is one possible loader, not part of the engine: nothing in
//! [`crate::eval`] depends on XML, and an embedder is free to build
//! [`Policy`](super::Policy) values directly or supply a different
//! loader (e.g. one backed by a running configuration datastore).

use serde::Deserialize;
use std::collections::HashSet;
use std::str::FromStr;

use crate::error::NacmError;

use super::{AccessOps, Group, Policy, Rule, RuleEffect, RuleList};

/// Default recovery user name per RFC 8341 §3.7 when the document
/// omits `<recovery-user>`.
const DEFAULT_RECOVERY_USER: &str = "recovery";

#[derive(Debug, Deserialize)]
struct XmlConfig {
    nacm: XmlNacm,
}

#[derive(Debug, Deserialize)]
struct XmlNacm {
    #[serde(rename = "enable-nacm")]
    enable_nacm: bool,
    #[serde(rename = "read-default", default)]
    read_default: Option<String>,
    #[serde(rename = "write-default", default)]
    write_default: Option<String>,
    #[serde(rename = "exec-default", default)]
    exec_default: Option<String>,
    #[serde(rename = "enable-external-groups", default)]
    enable_external_groups: bool,
    #[serde(rename = "recovery-user", default)]
    recovery_user: Option<String>,
    groups: XmlGroups,
    #[serde(rename = "rule-list", default)]
    rule_lists: Vec<XmlRuleList>,
}

#[derive(Debug, Deserialize, Default)]
struct XmlGroups {
    #[serde(default)]
    group: Vec<XmlGroup>,
}

#[derive(Debug, Deserialize)]
struct XmlGroup {
    name: String,
    #[serde(rename = "user-name", default)]
    user_names: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct XmlRuleList {
    #[serde(default)]
    name: String,
    group: String,
    #[serde(rename = "rule", default)]
    rules: Vec<XmlRule>,
}

#[derive(Debug, Deserialize)]
struct XmlRule {
    name: String,
    #[serde(rename = "module-name", default)]
    module_name: Option<String>,
    #[serde(rename = "rpc-name", default)]
    rpc_name: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(rename = "notification-name", default)]
    notification_name: Option<String>,
    #[serde(rename = "access-operations", default)]
    access_operations: Option<String>,
    action: String,
}

/// Parse an NACM XML document into a [`Policy`].
///
/// Returns [`NacmError::FatalConfig`] for malformed XML, an
/// unrecognised `action`/`*-default` value, or a rule declaring more
/// than one of `rpc-name`/`path`/`notification-name` (the data model
/// permits at most one, §3).
pub fn load_xml(xml: &str) -> Result<Policy, NacmError> {
    let config: XmlConfig =
        serde_xml_rs::from_str(xml).map_err(|e| NacmError::fatal_config(format!("malformed NACM XML: {e}")))?;
    let nacm = config.nacm;

    let groups = nacm
        .groups
        .group
        .into_iter()
        .map(|g| Group { name: g.name, users: g.user_names.into_iter().collect::<HashSet<_>>() })
        .collect();

    let mut rule_lists = Vec::with_capacity(nacm.rule_lists.len());
    for xrl in nacm.rule_lists {
        let mut rules = Vec::with_capacity(xrl.rules.len());
        for xr in xrl.rules {
            let rule_type_count = [xr.rpc_name.is_some(), xr.path.is_some(), xr.notification_name.is_some()]
                .into_iter()
                .filter(|b| *b)
                .count();
            if rule_type_count > 1 {
                return Err(NacmError::fatal_config(format!(
                    "rule '{}' declares more than one of rpc-name/path/notification-name",
                    xr.name
                )));
            }
            let action = RuleEffect::from_str(&xr.action)
                .map_err(|e| NacmError::fatal_config(format!("rule '{}': {e}", xr.name)))?;
            rules.push(Rule {
                name: xr.name,
                module_name: xr.module_name,
                rpc_name: xr.rpc_name,
                path: xr.path,
                notification_name: xr.notification_name,
                access_operations: xr.access_operations.as_deref().map(AccessOps::parse).unwrap_or_default(),
                action,
            });
        }
        rule_lists.push(RuleList { name: xrl.name, groups: vec![xrl.group], rules });
    }

    let parse_default = |field: &str, raw: Option<String>| -> Result<Option<RuleEffect>, NacmError> {
        raw.map(|s| RuleEffect::from_str(&s).map_err(|e| NacmError::fatal_config(format!("{field}: {e}"))))
            .transpose()
    };

    Ok(Policy {
        enable_nacm: nacm.enable_nacm,
        enable_external_groups: nacm.enable_external_groups,
        recovery_user: nacm.recovery_user.unwrap_or_else(|| DEFAULT_RECOVERY_USER.to_string()),
        read_default: parse_default("read-default", nacm.read_default)?,
        write_default: parse_default("write-default", nacm.write_default)?,
        exec_default: parse_default("exec-default", nacm.exec_default)?,
        groups,
        rule_lists,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::DefaultKind;

    const SAMPLE: &str = r#"
        <config xmlns="http://tail-f.com/ns/config/1.0">
          <nacm xmlns="urn:ietf:params:xml:ns:yang:ietf-netconf-acm">
            <enable-nacm>true</enable-nacm>
            <read-default>permit</read-default>
            <write-default>deny</write-default>
            <exec-default>permit</exec-default>
            <groups>
              <group>
                <name>admin</name>
                <user-name>alice</user-name>
              </group>
              <group>
                <name>oper</name>
                <user-name>bob</user-name>
              </group>
            </groups>
            <rule-list>
              <name>admin-acl</name>
              <group>admin</group>
              <rule>
                <name>permit-all</name>
                <module-name>*</module-name>
                <access-operations>*</access-operations>
                <action>permit</action>
              </rule>
            </rule-list>
            <rule-list>
              <name>oper-acl</name>
              <group>oper</group>
              <rule>
                <name>deny-edit-config</name>
                <module-name>*</module-name>
                <rpc-name>edit-config</rpc-name>
                <access-operations>exec</access-operations>
                <action>deny</action>
              </rule>
            </rule-list>
          </nacm>
        </config>
    "#;

    #[test]
    fn parses_groups_and_rule_lists() {
        let policy = load_xml(SAMPLE).unwrap();
        assert!(policy.enable_nacm);
        assert_eq!(policy.groups.len(), 2);
        assert_eq!(policy.rule_lists.len(), 2);
        assert_eq!(policy.default(DefaultKind::Write).unwrap(), RuleEffect::Deny);
        assert_eq!(policy.recovery_user, "recovery");
    }

    #[test]
    fn rejects_conflicting_rule_types() {
        let bad = r#"
            <config>
              <nacm>
                <enable-nacm>true</enable-nacm>
                <write-default>deny</write-default>
                <groups></groups>
                <rule-list>
                  <name>x</name>
                  <group>g</group>
                  <rule>
                    <name>bad</name>
                    <rpc-name>foo</rpc-name>
                    <path>/a</path>
                    <action>permit</action>
                  </rule>
                </rule-list>
              </nacm>
            </config>
        "#;
        assert!(load_xml(bad).is_err());
    }

    #[test]
    fn missing_write_default_surfaces_as_fatal_config_on_query() {
        let xml = r#"
            <config>
              <nacm>
                <enable-nacm>true</enable-nacm>
                <groups></groups>
              </nacm>
            </config>
        "#;
        let policy = load_xml(xml).unwrap();
        assert!(policy.default(DefaultKind::Write).is_err());
    }
}
