//! Request and verdict shapes shared by the three access evaluators.
//!
//! §3 describes `Request` as a three-way variant (RPC | Write | Read).
//! The RPC shape is small enough to bundle as [`RpcRequest`]; the write
//! and read shapes carry a generic tree node and are instead threaded
//! as plain parameters into [`crate::eval::evaluate_write`] and
//! [`crate::eval::evaluate_read`], matching the flat signatures §6
//! exposes.

use crate::error::AccessDenied;
use crate::policy::AccessMode;

/// One RPC invocation request (§3, `Request::RPC`).
#[derive(Debug, Clone)]
pub struct RpcRequest<'a> {
    /// Requesting user, or `None` if the transport layer could not
    /// authenticate one (§4.4 step 4 treats this as "jump to default").
    pub user: Option<&'a str>,
    /// YANG module the RPC belongs to.
    pub module: &'a str,
    /// RPC operation name, e.g. `"edit-config"`.
    pub operation: &'a str,
    /// Transport-provided group names to union in when
    /// `enable-external-groups` is set (§9 design note 4).
    pub extra_groups: &'a [String],
}

/// The write access being requested (§3, `Request::Write`). A subset
/// of [`AccessMode`] — exec and read never reach the write evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteAccess {
    /// Creating a new data-tree node.
    Create,
    /// Modifying an existing data-tree node.
    Update,
    /// Removing a data-tree node.
    Delete,
}

impl WriteAccess {
    /// Project onto the broader [`AccessMode`] enum used by
    /// `access-operations` matching.
    pub fn as_access_mode(self) -> AccessMode {
        match self {
            WriteAccess::Create => AccessMode::Create,
            WriteAccess::Update => AccessMode::Update,
            WriteAccess::Delete => AccessMode::Delete,
        }
    }
}

/// Outcome of `evaluate_rpc` / `evaluate_write` (§3, `Verdict`).
///
/// `evaluate_read` has no `Verdict` of its own — reads never surface a
/// denial to the caller, they just omit the denied data (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Access is permitted.
    Permit,
    /// Access is denied, with the structured payload to report back.
    Deny(AccessDenied),
}

impl Verdict {
    /// True iff this verdict is [`Verdict::Permit`].
    pub fn is_permit(&self) -> bool {
        matches!(self, Verdict::Permit)
    }
}
