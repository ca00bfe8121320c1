//! The Access Evaluators (§4.4–§4.6): the three entry points that
//! orchestrate pre-checks, group resolution, the Preparation Cache, and
//! the Matcher into a verdict (RPC/write) or a pruned tree (read).

mod read;
mod rpc;
mod write;

pub use read::evaluate_read;
pub use rpc::evaluate_rpc;
pub use write::evaluate_write;
