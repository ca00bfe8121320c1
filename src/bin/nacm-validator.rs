//! `nacm-validator`: a command-line front end for the NACM engine.
//!
//! Mirrors the shape of the `nacm-validator` prototype this crate grows
//! out of — single-request and JSON-batch modes, text/JSON/exit-code
//! output, shell-friendly exit codes (0 permit, 1 deny, 2 error) — but
//! is re-targeted at the three evaluator entry points instead of a
//! single `validate()` call, and needs a data tree for write/read
//! requests since those operate over one.

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use nacm_engine::tree::memory::{MemorySchema, NodeId, Tree};
use nacm_engine::{evaluate_read, evaluate_rpc, evaluate_write, policy, DataTree, RpcRequest, Verdict, WriteAccess};

#[derive(Parser)]
#[command(author, version, about = "RFC 8341 NACM access-control validator", long_about = None)]
struct Cli {
    /// Path to the NACM XML policy document.
    #[arg(short, long)]
    config: PathBuf,

    /// Requesting user. Omit to evaluate as an unauthenticated request.
    #[arg(short, long)]
    user: Option<String>,

    /// External group names to union in when enable-external-groups is set.
    #[arg(long = "extra-group")]
    extra_groups: Vec<String>,

    /// Output format.
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    request: RequestArg,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable text.
    Text,
    /// Structured JSON.
    Json,
    /// No output, exit code only.
    ExitCode,
}

#[derive(Subcommand)]
enum RequestArg {
    /// Evaluate an RPC/action invocation.
    Rpc {
        /// YANG module the RPC belongs to.
        #[arg(short, long)]
        module: String,
        /// RPC operation name.
        #[arg(short, long)]
        operation: String,
    },
    /// Evaluate a data-tree write (create/update/delete).
    Write {
        #[arg(value_enum)]
        access: WriteAccessArg,
        /// s-expression tree fixture, e.g. `(r (x) (y (z)))`.
        #[arg(long)]
        tree: PathBuf,
        /// Path of the node being written, e.g. `/r/y`.
        #[arg(long)]
        path: String,
        /// Module every node in the tree belongs to.
        #[arg(long, default_value = "default")]
        module: String,
    },
    /// Evaluate a data-tree read, printing the pruned tree.
    Read {
        /// s-expression tree fixture, e.g. `(r (x) (y (z)))`.
        #[arg(long)]
        tree: PathBuf,
        /// Paths of the requested subtree roots, e.g. `/r/y`.
        #[arg(long = "root")]
        roots: Vec<String>,
        /// Module every node in the tree belongs to.
        #[arg(long, default_value = "default")]
        module: String,
    },
    /// Read JSON-encoded RPC requests from stdin, one per line.
    Batch {
        /// Format each line is expected in; only RPC requests are supported.
        #[arg(long, default_value = "rpc")]
        kind: String,
    },
}

#[derive(Clone, ValueEnum)]
enum WriteAccessArg {
    Create,
    Update,
    Delete,
}

impl From<WriteAccessArg> for WriteAccess {
    fn from(access: WriteAccessArg) -> Self {
        match access {
            WriteAccessArg::Create => WriteAccess::Create,
            WriteAccessArg::Update => WriteAccess::Update,
            WriteAccessArg::Delete => WriteAccess::Delete,
        }
    }
}

#[derive(serde::Deserialize)]
struct JsonRpcRequest {
    user: Option<String>,
    module: String,
    operation: String,
}

#[derive(Serialize)]
struct JsonVerdict {
    decision: String,
    message: Option<String>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(2)
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    let xml = std::fs::read_to_string(&cli.config)
        .with_context(|| format!("reading policy file {}", cli.config.display()))?;
    let policy = policy::load_xml(&xml).context("parsing NACM policy")?;

    match &cli.request {
        RequestArg::Rpc { module, operation } => {
            let req = RpcRequest { user: cli.user.as_deref(), module, operation, extra_groups: &cli.extra_groups };
            let verdict = evaluate_rpc(&req, &policy)?;
            Ok(report(&verdict, cli))
        }
        RequestArg::Write { access, tree, path, module } => {
            let (tree_data, schema, root) = load_tree(tree, module)?;
            let targets = tree_data.resolve_instance_id(&root, path)?;
            let Some(target) = targets.into_iter().next() else {
                bail!("path '{path}' does not resolve to any node in {}", tree.display());
            };
            let verdict = evaluate_write(
                &tree_data,
                &schema,
                (*access).clone().into(),
                &root,
                &target,
                cli.user.as_deref(),
                &cli.extra_groups,
                &policy,
            )?;
            Ok(report(&verdict, cli))
        }
        RequestArg::Read { tree, roots, module } => {
            let (mut tree_data, schema, root) = load_tree(tree, module)?;
            let mut request_roots = Vec::with_capacity(roots.len());
            for p in roots {
                let targets = tree_data.resolve_instance_id(&root, p)?;
                let Some(target) = targets.into_iter().next() else {
                    bail!("path '{p}' does not resolve to any node in {}", tree.display());
                };
                request_roots.push(target);
            }
            evaluate_read(&mut tree_data, &schema, &root, &request_roots, cli.user.as_deref(), &cli.extra_groups, &policy)?;
            match cli.format {
                OutputFormat::ExitCode => {}
                _ => println!("{}", tree_data.render(root)),
            }
            Ok(ExitCode::from(0))
        }
        RequestArg::Batch { kind } => {
            if kind != "rpc" {
                bail!("only 'rpc' batch requests are supported");
            }
            run_batch(&policy, cli)
        }
    }
}

fn run_batch(policy: &policy::Policy, cli: &Cli) -> Result<ExitCode> {
    let stdin = io::stdin();
    let mut any_denied = false;
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }
        let req: JsonRpcRequest = serde_json::from_str(&line).context("parsing JSON request line")?;
        let extra: Vec<String> = cli.extra_groups.clone();
        let rpc_req = RpcRequest { user: req.user.as_deref(), module: &req.module, operation: &req.operation, extra_groups: &extra };
        let verdict = evaluate_rpc(&rpc_req, policy)?;
        if matches!(verdict, Verdict::Deny(_)) {
            any_denied = true;
        }
        let json = JsonVerdict {
            decision: if verdict.is_permit() { "permit".to_string() } else { "deny".to_string() },
            message: match verdict {
                Verdict::Deny(d) => Some(d.message.to_string()),
                Verdict::Permit => None,
            },
        };
        println!("{}", serde_json::to_string(&json)?);
    }
    Ok(ExitCode::from(if any_denied { 1 } else { 0 }))
}

fn report(verdict: &Verdict, cli: &Cli) -> ExitCode {
    match cli.format {
        OutputFormat::Text => match verdict {
            Verdict::Permit => println!("PERMIT"),
            Verdict::Deny(d) => println!("DENY: {}", d.message),
        },
        OutputFormat::Json => {
            let json = JsonVerdict {
                decision: if verdict.is_permit() { "permit".to_string() } else { "deny".to_string() },
                message: match verdict {
                    Verdict::Deny(d) => Some(d.message.to_string()),
                    Verdict::Permit => None,
                },
            };
            println!("{}", serde_json::to_string_pretty(&json).expect("JsonVerdict always serializes"));
        }
        OutputFormat::ExitCode => {}
    }
    match verdict {
        Verdict::Permit => ExitCode::from(0),
        Verdict::Deny(_) => ExitCode::from(1),
    }
}

/// Load a tiny s-expression tree fixture, e.g. `(r (x) (y (z)))`, with
/// every node assigned to `module`.
fn load_tree(path: &PathBuf, module: &str) -> Result<(Tree, MemorySchema, NodeId)> {
    let text = std::fs::read_to_string(path).with_context(|| format!("reading tree fixture {}", path.display()))?;
    let mut chars = text.trim().chars().peekable();
    let tree = fixture::parse_root(&mut chars)?;
    let root = tree.root();
    let schema = MemorySchema::new(module.to_string());
    Ok((tree, schema, root))
}

/// A minimal recursive-descent parser for the `(name child...)` fixture
/// format used by the bundled examples and CLI tree arguments.
mod fixture {
    use super::*;
    use anyhow::anyhow;
    use std::iter::Peekable;
    use std::str::Chars;

    pub fn parse_root(chars: &mut Peekable<Chars>) -> Result<Tree> {
        skip_ws(chars);
        expect(chars, '(')?;
        let name = parse_name(chars)?;
        let mut tree = Tree::new(name);
        let root = tree.root();
        parse_children(chars, &mut tree, root)?;
        Ok(tree)
    }

    fn parse_children(chars: &mut Peekable<Chars>, tree: &mut Tree, parent: nacm_engine::tree::memory::NodeId) -> Result<()> {
        loop {
            skip_ws(chars);
            match chars.peek() {
                Some(')') => {
                    chars.next();
                    return Ok(());
                }
                Some('(') => {
                    chars.next();
                    let name = parse_name(chars)?;
                    let child = tree.add_child(parent, name);
                    parse_children(chars, tree, child)?;
                }
                Some(_) => {
                    return Err(anyhow!("expected '(' or ')' in tree fixture"));
                }
                None => return Err(anyhow!("unexpected end of tree fixture")),
            }
        }
    }

    fn parse_name(chars: &mut Peekable<Chars>) -> Result<String> {
        let mut name = String::new();
        while let Some(&c) = chars.peek() {
            if c == '(' || c == ')' || c.is_whitespace() {
                break;
            }
            name.push(c);
            chars.next();
        }
        if name.is_empty() {
            return Err(anyhow!("expected an element name in tree fixture"));
        }
        Ok(name)
    }

    fn skip_ws(chars: &mut Peekable<Chars>) {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
    }

    fn expect(chars: &mut Peekable<Chars>, expected: char) -> Result<()> {
        match chars.next() {
            Some(c) if c == expected => Ok(()),
            other => Err(anyhow!("expected '{expected}', found {other:?}")),
        }
    }
}
