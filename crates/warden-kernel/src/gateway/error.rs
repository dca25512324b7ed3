//! Gateway error types.
//!
//! [`GatewayError`] is what the caller of a generated callable sees. Each
//! variant maps onto one terminal [`AuditOutcome`]. Messages carry the
//! command identifier and redacted detail only; raw parameters and results
//! never appear in them.

use crate::audit::AuditOutcome;
use thiserror::Error;

/// Failure of the privileged call itself, as reported by the transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum InvokeError {
    /// The bridge could not deliver the request or the reply.
    #[error("transport error: {0}")]
    Transport(String),

    /// The privileged side ran the command and it failed.
    #[error("backend error: {0}")]
    Backend(String),

    /// No handler is registered for the command on the privileged side.
    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    /// The bridge has shut down.
    #[error("invoker channel closed")]
    Closed,
}

impl InvokeError {
    /// Stable, value-free name of the failure kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(_) => "transport",
            Self::Backend(_) => "backend",
            Self::UnknownCommand(_) => "unknown_command",
            Self::Closed => "closed",
        }
    }
}

/// Error raised by a generated gateway callable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GatewayError {
    /// Parameters failed the declared shape check.
    #[error("invalid parameters for '{command}': {reason}")]
    Validation { command: String, reason: String },

    /// One or more required capabilities are not granted.
    #[error("'{command}' requires capabilities that are not granted: {}", .missing.join(", "))]
    CapabilityDenied { command: String, missing: Vec<String> },

    /// The privileged call failed.
    #[error("invocation of '{command}' failed")]
    Invocation {
        command: String,
        #[source]
        source: InvokeError,
    },

    /// The privileged call returned data that breaks the declared contract.
    #[error("result of '{command}' failed validation")]
    ResultValidation { command: String },

    /// The invocation timed out or was cancelled before completing.
    #[error("invocation of '{command}' was cancelled")]
    Cancelled { command: String },

    /// The call spec itself is malformed (detected at build time).
    #[error("invalid gateway call spec: {0}")]
    InvalidSpec(String),
}

impl GatewayError {
    /// Terminal outcome recorded in the audit trail for this error.
    pub fn outcome(&self) -> AuditOutcome {
        match self {
            Self::Validation { .. } | Self::InvalidSpec(_) => AuditOutcome::ValidationFailed,
            Self::CapabilityDenied { .. } => AuditOutcome::CapabilityDenied,
            Self::Invocation { .. } => AuditOutcome::InvocationFailed,
            Self::ResultValidation { .. } => AuditOutcome::ResultRejected,
            Self::Cancelled { .. } => AuditOutcome::Cancelled,
        }
    }

    /// Command identifier, if the error belongs to an invocation.
    pub fn command(&self) -> Option<&str> {
        match self {
            Self::Validation { command, .. }
            | Self::CapabilityDenied { command, .. }
            | Self::Invocation { command, .. }
            | Self::ResultValidation { command }
            | Self::Cancelled { command } => Some(command),
            Self::InvalidSpec(_) => None,
        }
    }

    /// Generic, non-disclosing message suitable for an end-user surface.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "The request was not valid.",
            Self::CapabilityDenied { .. } => "This action is not permitted.",
            Self::Invocation { .. } => "The action could not be completed.",
            Self::ResultValidation { .. } => "The action returned an unexpected response.",
            Self::Cancelled { .. } => "The action was cancelled.",
            Self::InvalidSpec(_) => "The action is misconfigured.",
        }
    }
}
