//! Crate-level error types for `warden-kernel`.
//!
//! [`KernelError`] composes the typed errors of every sub-module so that `?`
//! converts them automatically. Assembly-time code paths (config loading,
//! runtime construction) return [`KernelResult`], an
//! [`error_stack::Report`] that carries human-readable context as it
//! propagates.
//!
//! ```rust,ignore
//! use error_stack::ResultExt;
//! use warden_kernel::error::{KernelError, KernelResult};
//!
//! fn load(path: &str) -> KernelResult<Settings> {
//!     warden_kernel::config::load_config(path)
//!         .map_err(KernelError::from)
//!         .map_err(error_stack::Report::new)
//!         .attach(format!("loading {path}"))
//! }
//! ```

use crate::audit::AuditError;
use crate::capability::CapabilityError;
use crate::config::ConfigError;
use crate::gateway::{GatewayError, InvokeError};
use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum KernelError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Invoker error: {0}")]
    Invoke(#[from] InvokeError),

    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

/// `Result<T, error_stack::Report<KernelError>>`.
pub type KernelResult<T> = Result<T, error_stack::Report<KernelError>>;
