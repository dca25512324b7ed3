//! Privileged call gateway contract.
//!
//! This module defines the *declarative call spec*, the transport seam and
//! the error taxonomy of the gateway. The executing implementation
//! (`Gateway` / `GatewayCall`) lives in `warden-runtime`.
//!
//! ```text
//! params ─► validate ─► sanitize ─► capability gate ─► invoke ─► validate result ─► R
//!              │            │              │               │             │
//!              └────────────┴──────────────┴───────────────┴─────────────┴─► exactly one
//!                                                                            terminal audit event
//! ```
//!
//! # Quick start
//!
//! ```rust
//! use warden_kernel::gateway::GatewayCallSpec;
//! use warden_kernel::validation::{has_required_properties, matches_type, validator};
//!
//! #[derive(serde::Serialize)]
//! struct WriteFile { path: String, content: String }
//!
//! #[derive(serde::Deserialize)]
//! struct Written { #[serde(rename = "bytesWritten")] bytes_written: u64 }
//!
//! let spec = GatewayCallSpec::<WriteFile, Written>::new("fs:write_file")
//!     .with_param_validator(validator(|v| has_required_properties(v, &["path", "content"])))
//!     .with_result_validator(matches_type::<Written>())
//!     .require("fs:write");
//!
//! spec.validate().expect("spec is well formed");
//! ```

pub mod error;
pub mod invoker;
pub mod sanitize;
pub mod spec;

pub use error::{GatewayError, InvokeError};
pub use invoker::PrivilegedCallInvoker;
pub use sanitize::{ParamSanitizer, Sanitized};
pub use spec::GatewayCallSpec;

/// Stage of one gateway invocation, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Validating,
    Sanitizing,
    CapabilityChecking,
    Invoking,
    ResultValidating,
    Succeeded,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Validating => "validating",
            Stage::Sanitizing => "sanitizing",
            Stage::CapabilityChecking => "capability_checking",
            Stage::Invoking => "invoking",
            Stage::ResultValidating => "result_validating",
            Stage::Succeeded => "succeeded",
        }
    }
}
