//! `warden-kernel`: contracts for the capability-gated privileged call
//! gateway.
//!
//! This crate defines the *types and trait seams* every other crate builds
//! on. No concrete sinks, registries or transports live here; those belong
//! in `warden-runtime`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                  warden-kernel  (this crate)                 │
//! │  validation::*        audit::{AuditEvent, AuditWriter}       │
//! │  capability::{Capability, CapabilitySource}                  │
//! │  gateway::{GatewayCallSpec, PrivilegedCallInvoker,           │
//! │            ParamSanitizer, GatewayError}                     │
//! │  config::*   secret::SecretString   error::KernelError       │
//! └──────────────────────────────┬───────────────────────────────┘
//!                                │  depends on
//! ┌──────────────────────────────▼───────────────────────────────┐
//! │                  warden-runtime                              │
//! │  AuditLog   CapabilityRegistry   Gateway / GatewayCall       │
//! │  ChannelInvoker + CommandRouter   DefaultSanitizer           │
//! └──────────────────────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod capability;
pub mod config;
pub mod error;
pub mod gateway;
pub mod secret;
pub mod validation;

pub use audit::{AuditCategory, AuditEvent, AuditFilter, AuditLevel, AuditOutcome, AuditWriter};
pub use capability::{Capability, CapabilityCheck, CapabilitySeverity, CapabilitySource};
pub use error::{KernelError, KernelResult};
pub use gateway::{GatewayCallSpec, GatewayError, InvokeError, PrivilegedCallInvoker};
pub use secret::SecretString;
pub use validation::Validator;
