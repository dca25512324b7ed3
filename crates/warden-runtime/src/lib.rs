//! `warden-runtime`: concrete implementations of the `warden-kernel`
//! contracts.
//!
//! | Kernel contract | Implementation |
//! |-----------------|----------------|
//! | [`AuditWriter`](warden_kernel::audit::AuditWriter) | [`audit::TracingWriter`], [`audit::JsonlFileWriter`], [`audit::ChannelWriter`] |
//! | audit sink | [`audit::AuditLog`] |
//! | [`CapabilitySource`](warden_kernel::capability::CapabilitySource) consumer | [`capability::CapabilityRegistry`] |
//! | [`GatewayCallSpec`](warden_kernel::gateway::GatewayCallSpec) executor | [`gateway::Gateway`] / [`gateway::GatewayCall`] |
//! | [`PrivilegedCallInvoker`](warden_kernel::gateway::PrivilegedCallInvoker) | [`bridge::ChannelInvoker`] |
//! | [`ParamSanitizer`](warden_kernel::gateway::ParamSanitizer) | [`sanitize::DefaultSanitizer`] |
//!
//! [`runtime::WardenRuntime`] assembles one shared instance of each from a
//! [`config::WardenConfig`].
//!
//! # Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden_kernel::gateway::GatewayCallSpec;
//! use warden_kernel::validation::{matches_type, safe_path_property};
//! use warden_runtime::bridge::CommandRouter;
//! use warden_runtime::config::WardenConfig;
//! use warden_runtime::runtime::WardenRuntime;
//! # use warden_kernel::capability::{CapabilityError, CapabilitySource};
//! # struct AllowAll;
//! # #[async_trait::async_trait]
//! # impl CapabilitySource for AllowAll {
//! #     async fn query_grant(&self, _: &str) -> Result<bool, CapabilityError> { Ok(true) }
//! # }
//!
//! #[derive(serde::Serialize)]
//! struct ReadFile { path: String }
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let (invoker, _host) = Arc::new(CommandRouter::new()).spawn(64);
//! let runtime = WardenRuntime::from_config(
//!     &WardenConfig::default(),
//!     Arc::new(AllowAll),
//!     Arc::new(invoker),
//! )
//! .map_err(|r| r.current_context().to_string())?;
//!
//! let read = runtime.gateway().build(
//!     GatewayCallSpec::<ReadFile, String>::new("fs:read_text")
//!         .with_param_validator(safe_path_property("path"))
//!         .with_result_validator(matches_type::<String>())
//!         .require("fs:read"),
//! )?;
//!
//! let text = read.call(ReadFile { path: "notes.txt".into() }).await?;
//! # let _ = text;
//! # Ok(())
//! # }
//! ```

pub mod audit;
pub mod bridge;
pub mod capability;
pub mod config;
pub mod gateway;
pub mod manifest;
pub mod runtime;
pub mod sanitize;
pub mod telemetry;

// Re-export the kernel contracts for convenience.
pub use warden_kernel as kernel;

pub use audit::AuditLog;
pub use capability::CapabilityRegistry;
pub use gateway::{Gateway, GatewayCall};
pub use runtime::WardenRuntime;
