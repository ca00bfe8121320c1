//! Error and deny-payload types for the NACM engine.
//!
//! The engine distinguishes a *verdict* (a deny is an expected, valid
//! outcome of evaluation — see [`crate::request::Verdict`]) from an
//! *error* (something that prevented evaluation from completing at
//! all). [`NacmError`] covers only the latter, per RFC 8341 §3.4: a
//! missing `write-default`, or a failure reported by the schema/data-tree
//! collaborators the engine does not own.

use std::fmt;

/// Structured `access-denied` payload attached to a [`crate::request::Verdict::Deny`].
///
/// This is not a wire format — it is the minimal information a caller
/// needs to render one (a NETCONF `<rpc-error>`, a RESTCONF error body,
/// …). The engine never serializes it itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied {
    /// RFC 8341 application tag, always `"access-denied"`.
    pub app_tag: &'static str,
    /// Human-readable reason: `"access denied"` for a rule match,
    /// `"default deny"` for the default-rule fallback.
    pub message: &'static str,
}

impl AccessDenied {
    /// A deny produced by an explicit rule match (§4.4 step 6, §4.5 step 1).
    pub fn rule_match() -> Self {
        AccessDenied { app_tag: "access-denied", message: "access denied" }
    }

    /// A deny produced by falling through to a default action (§4.4 step
    /// 7, §4.5 step 2).
    pub fn default_deny() -> Self {
        AccessDenied { app_tag: "access-denied", message: "default deny" }
    }
}

impl fmt::Display for AccessDenied {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.app_tag, self.message)
    }
}

/// Opaque failure from a data-tree or schema collaborator (§6).
///
/// The engine is generic over the host's actual tree/schema library, so
/// it cannot name a concrete error type for every possible
/// implementation. Collaborators box their own error behind this
/// newtype; the engine only ever propagates it.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct CollaboratorError(#[source] pub Box<dyn std::error::Error + Send + Sync + 'static>);

impl CollaboratorError {
    /// Wrap any standard error as a collaborator failure.
    pub fn new(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        CollaboratorError(Box::new(err))
    }

    /// Wrap a plain message as a collaborator failure.
    pub fn msg(message: impl Into<String>) -> Self {
        #[derive(Debug, thiserror::Error)]
        #[error("{0}")]
        struct Message(String);
        CollaboratorError(Box::new(Message(message.into())))
    }
}

/// Errors internal to the engine: malformed policy, or a collaborator
/// failure. Never used to represent a deny verdict.
#[derive(Debug, thiserror::Error)]
pub enum NacmError {
    /// A mandatory policy field was missing or held an unrecognised
    /// value (e.g. `write-default` absent, or an `action` that is
    /// neither `permit` nor `deny`).
    #[error("invalid NACM policy configuration: {0}")]
    FatalConfig(String),

    /// The schema or data-tree collaborator reported a failure (path
    /// canonicalisation, instance-id resolution, xpath evaluation, …).
    #[error("data-tree or schema collaborator failed: {0}")]
    CollaboratorFailure(#[source] CollaboratorError),
}

impl NacmError {
    /// Build a [`NacmError::FatalConfig`] from a formatted message.
    pub fn fatal_config(message: impl Into<String>) -> Self {
        NacmError::FatalConfig(message.into())
    }
}

impl From<CollaboratorError> for NacmError {
    fn from(err: CollaboratorError) -> Self {
        NacmError::CollaboratorFailure(err)
    }
}
