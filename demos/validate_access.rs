//! Runs a handful of representative requests through the three
//! evaluators against a small embedded policy and data tree, printing
//! the verdicts. Run with `cargo run --example validate_access`.

use nacm_engine::tree::memory::MemorySchema;
use nacm_engine::{evaluate_read, evaluate_rpc, evaluate_write, policy, RpcRequest, Verdict, WriteAccess};

const POLICY_XML: &str = r#"
<config>
  <nacm>
    <enable-nacm>true</enable-nacm>
    <read-default>permit</read-default>
    <write-default>deny</write-default>
    <exec-default>deny</exec-default>
    <groups>
      <group><name>admin</name><user-name>admin</user-name></group>
      <group><name>oper</name><user-name>oper</user-name></group>
    </groups>
    <rule-list>
      <name>admin-acl</name>
      <group>admin</group>
      <rule>
        <name>any-access</name>
        <module-name>*</module-name>
        <access-operations>*</access-operations>
        <action>permit</action>
      </rule>
    </rule-list>
    <rule-list>
      <name>oper-acl</name>
      <group>oper</group>
      <rule>
        <name>allow-get-config</name>
        <module-name>*</module-name>
        <rpc-name>get-config</rpc-name>
        <access-operations>exec</access-operations>
        <action>permit</action>
      </rule>
      <rule>
        <name>deny-interfaces-write</name>
        <module-name>*</module-name>
        <path>/interfaces</path>
        <access-operations>write</access-operations>
        <action>deny</action>
      </rule>
    </rule-list>
  </nacm>
</config>
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let policy = policy::load_xml(POLICY_XML)?;
    println!("policy loaded: {} rule-lists", policy.rule_lists().len());

    println!("\n-- RPC requests --");
    for (user, operation) in [("admin", "edit-config"), ("oper", "get-config"), ("oper", "edit-config")] {
        let req = RpcRequest { user: Some(user), module: "ietf-netconf", operation, extra_groups: &[] };
        let verdict = evaluate_rpc(&req, &policy)?;
        println!("{user} invoking {operation}: {}", describe(&verdict));
    }

    println!("\n-- write requests --");
    let mut tree = nacm_engine::tree::memory::Tree::new("config");
    let root = tree.root();
    let interfaces = tree.add_child(root, "interfaces");
    tree.add_leaf(interfaces, "interface", "eth0");
    let schema = MemorySchema::new("ietf-interfaces");
    for (user, access) in [("admin", WriteAccess::Update), ("oper", WriteAccess::Update)] {
        let verdict = evaluate_write(&tree, &schema, access, &root, &interfaces, Some(user), &[], &policy)?;
        println!("{user} writing /config/interfaces: {}", describe(&verdict));
    }

    println!("\n-- read request --");
    evaluate_read(&mut tree, &schema, &root, &[root], Some("oper"), &[], &policy)?;
    println!("tree visible to oper after read pruning: {}", tree.render(root));

    Ok(())
}

fn describe(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Permit => "PERMIT",
        Verdict::Deny(_) => "DENY",
    }
}
