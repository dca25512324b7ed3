//! Assembly of the process-wide gateway components.

use crate::audit::{AuditLog, JsonlFileWriter, TracingWriter};
use crate::capability::CapabilityRegistry;
use crate::config::WardenConfig;
use crate::gateway::Gateway;
use error_stack::{Report, ResultExt};
use std::sync::Arc;
use warden_kernel::audit::{AuditCategory, AuditDraft, AuditLevel};
use warden_kernel::capability::CapabilitySource;
use warden_kernel::error::{KernelError, KernelResult};
use warden_kernel::gateway::PrivilegedCallInvoker;

/// One shared [`AuditLog`], [`CapabilityRegistry`] and [`Gateway`].
///
/// Build it once at startup and hand clones of the `Arc`s to whatever needs
/// them; there are no global singletons.
#[derive(Debug, Clone)]
pub struct WardenRuntime {
    audit: Arc<AuditLog>,
    registry: Arc<CapabilityRegistry>,
    gateway: Gateway,
}

impl WardenRuntime {
    pub fn from_config(
        config: &WardenConfig,
        source: Arc<dyn CapabilitySource>,
        invoker: Arc<dyn PrivilegedCallInvoker>,
    ) -> KernelResult<Self> {
        config
            .validate()
            .map_err(|e| Report::new(KernelError::from(e)))
            .attach("validating runtime configuration")?;

        let mut audit = AuditLog::new(config.audit.capacity);
        if config.audit.tracing {
            audit = audit.with_writer(Arc::new(TracingWriter));
        }
        if let Some(path) = &config.audit.jsonl_path {
            let writer = JsonlFileWriter::open(path)
                .map_err(|e| Report::new(KernelError::from(e)))
                .attach(format!("opening audit file {}", path.display()))?;
            audit = audit.with_writer(Arc::new(writer));
        }
        let audit = Arc::new(audit);

        let mut registry =
            CapabilityRegistry::new(config.capabilities.clone(), source, Arc::clone(&audit))
                .map_err(|e| Report::new(KernelError::from(e)))
                .attach("declaring capabilities")?;
        if let Some(ttl) = config.registry.cache_ttl() {
            registry = registry.with_cache_ttl(ttl);
        }
        let registry = Arc::new(registry);

        let mut gateway = Gateway::new(Arc::clone(&registry), Arc::clone(&audit), invoker);
        if let Some(timeout) = config.gateway.default_timeout() {
            gateway = gateway.with_default_timeout(timeout);
        }

        audit.record_event(
            AuditDraft::new(
                AuditLevel::Info,
                AuditCategory::Configuration,
                "warden runtime started",
                "runtime",
            )
            .with_context("capabilities", config.capabilities.len())
            .with_context("audit_capacity", audit.capacity())
            .with_context("writers", audit.writer_names()),
        );

        Ok(Self {
            audit,
            registry,
            gateway,
        })
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }
}
