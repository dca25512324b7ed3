//! Executing gateway.
//!
//! [`Gateway::build`] turns a [`GatewayCallSpec`] into a [`GatewayCall`], an
//! async callable that runs every invocation through the same pipeline:
//!
//! 1. serialize `P` and run the parameter validator
//! 2. run the sanitizer (warn event when it neutralised something)
//! 3. check every required capability
//! 4. invoke the privileged command, bounded by the call timeout if any
//! 5. run the result validator and deserialize into `R`
//!
//! Each step runs at most once. The first failing step ends the call with
//! the matching [`GatewayError`]; every call, failed or not, leaves exactly
//! one terminal audit event whose `source` is the command identifier.

mod invocation;

use crate::audit::AuditLog;
use crate::capability::CapabilityRegistry;
use invocation::Invocation;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use warden_kernel::audit::AuditCategory;
use warden_kernel::gateway::{GatewayCallSpec, GatewayError, PrivilegedCallInvoker, Stage};

/// Shared pipeline dependencies. Cheap to clone.
#[derive(Clone)]
pub struct Gateway {
    registry: Arc<CapabilityRegistry>,
    audit: Arc<AuditLog>,
    invoker: Arc<dyn PrivilegedCallInvoker>,
    default_timeout: Option<Duration>,
}

impl Gateway {
    pub fn new(
        registry: Arc<CapabilityRegistry>,
        audit: Arc<AuditLog>,
        invoker: Arc<dyn PrivilegedCallInvoker>,
    ) -> Self {
        Self {
            registry,
            audit,
            invoker,
            default_timeout: None,
        }
    }

    /// Timeout for specs that do not set their own.
    #[must_use]
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    pub fn audit(&self) -> &Arc<AuditLog> {
        &self.audit
    }

    pub fn registry(&self) -> &Arc<CapabilityRegistry> {
        &self.registry
    }

    /// Validate `spec` and wrap it into a callable.
    pub fn build<P, R>(&self, spec: GatewayCallSpec<P, R>) -> Result<GatewayCall<P, R>, GatewayError> {
        spec.validate()?;

        for name in &spec.required_capabilities {
            if self.registry.declaration(name).is_none() {
                tracing::warn!(
                    command = %spec.command,
                    capability = %name,
                    "call requires an undeclared capability and will always be denied"
                );
            }
        }

        let category = category_for(&spec.command);
        Ok(GatewayCall {
            spec: Arc::new(spec),
            category,
            gateway: self.clone(),
        })
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("registry", &self.registry)
            .field("audit", &self.audit)
            .field("default_timeout", &self.default_timeout)
            .finish_non_exhaustive()
    }
}

/// Async callable produced by [`Gateway::build`].
pub struct GatewayCall<P, R> {
    spec: Arc<GatewayCallSpec<P, R>>,
    category: AuditCategory,
    gateway: Gateway,
}

impl<P, R> Clone for GatewayCall<P, R> {
    fn clone(&self) -> Self {
        Self {
            spec: Arc::clone(&self.spec),
            category: self.category,
            gateway: self.gateway.clone(),
        }
    }
}

impl<P, R> fmt::Debug for GatewayCall<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCall")
            .field("spec", &self.spec)
            .field("category", &self.category)
            .finish_non_exhaustive()
    }
}

impl<P, R> GatewayCall<P, R> {
    pub fn command(&self) -> &str {
        &self.spec.command
    }

    pub fn spec(&self) -> &GatewayCallSpec<P, R> {
        &self.spec
    }
}

impl<P, R> GatewayCall<P, R>
where
    P: Serialize,
    R: DeserializeOwned,
{
    /// Run one invocation.
    pub async fn call(&self, params: P) -> Result<R, GatewayError> {
        let spec = &*self.spec;
        let command = spec.command.as_str();
        let mut inv = Invocation::start(Arc::clone(&self.gateway.audit), command, self.category);

        // Validating
        let serialized = serde_json::to_value(&params);
        drop(params);
        let mut value = match serialized {
            Ok(value) => value,
            Err(err) => {
                let reason = format!("parameters could not be serialized: {err}");
                return Err(inv.fail(
                    GatewayError::Validation {
                        command: command.to_string(),
                        reason,
                    },
                    AuditCategory::Validation,
                    Map::new(),
                ));
            }
        };

        if let Some(validate) = &spec.validate_params {
            if !validate(&value) {
                let shape = describe_shape(&value);
                let mut extra = Map::new();
                extra.insert("shape".into(), Value::from(shape.as_str()));
                if spec.log_params {
                    extra.insert("params".into(), value.clone());
                }
                return Err(inv.fail(
                    GatewayError::Validation {
                        command: command.to_string(),
                        reason: format!("parameters do not match the declared shape (got {shape})"),
                    },
                    AuditCategory::Validation,
                    extra,
                ));
            }
        }

        // Sanitizing
        inv.advance(Stage::Sanitizing);
        if let Some(sanitizer) = &spec.sanitize_params {
            let sanitized = sanitizer.sanitize(value);
            if !sanitized.suspicious.is_empty() {
                let mut extra = Map::new();
                extra.insert("patterns".into(), Value::from(sanitized.suspicious));
                inv.warn(
                    AuditCategory::Validation,
                    "suspicious input sanitized",
                    extra,
                );
            }
            value = sanitized.value;
        }

        // CapabilityChecking
        inv.advance(Stage::CapabilityChecking);
        if !spec.required_capabilities.is_empty() {
            let check = self
                .gateway
                .registry
                .check_all(&spec.required_capabilities)
                .await;
            if !check.granted {
                let mut extra = Map::new();
                extra.insert("missing".into(), Value::from(check.missing.clone()));
                return Err(inv.fail(
                    GatewayError::CapabilityDenied {
                        command: command.to_string(),
                        missing: check.missing,
                    },
                    AuditCategory::Authorization,
                    extra,
                ));
            }
        }

        // Invoking
        inv.advance(Stage::Invoking);
        let logged_params = spec.log_params.then(|| value.clone());
        let invoked = self.gateway.invoker.invoke(command, value);
        let outcome = match spec.timeout.or(self.gateway.default_timeout) {
            Some(limit) => match tokio::time::timeout(limit, invoked).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let mut extra = Map::new();
                    extra.insert("timeout_ms".into(), Value::from(limit.as_millis() as u64));
                    return Err(inv.fail(
                        GatewayError::Cancelled {
                            command: command.to_string(),
                        },
                        self.category,
                        extra,
                    ));
                }
            },
            None => invoked.await,
        };
        let raw = match outcome {
            Ok(raw) => raw,
            Err(source) => {
                let mut extra = Map::new();
                extra.insert("cause_kind".into(), Value::from(source.kind()));
                // Handler messages may echo parameter values.
                if spec.log_params {
                    extra.insert("cause".into(), Value::from(source.to_string()));
                }
                return Err(inv.fail(
                    GatewayError::Invocation {
                        command: command.to_string(),
                        source,
                    },
                    self.category,
                    extra,
                ));
            }
        };

        // ResultValidating
        inv.advance(Stage::ResultValidating);
        if let Some(validate) = &spec.validate_result {
            if !validate(&raw) {
                let mut extra = Map::new();
                extra.insert("shape".into(), Value::from(describe_shape(&raw)));
                if spec.log_result {
                    extra.insert("result".into(), raw);
                }
                return Err(inv.fail(
                    GatewayError::ResultValidation {
                        command: command.to_string(),
                    },
                    AuditCategory::Integrity,
                    extra,
                ));
            }
        }

        let logged_result = spec.log_result.then(|| raw.clone());
        let typed = match serde_json::from_value::<R>(raw) {
            Ok(typed) => typed,
            Err(err) => {
                tracing::debug!(
                    command = %command,
                    invocation_id = %inv.id(),
                    error = %err,
                    "result does not deserialize into the declared type"
                );
                let mut extra = Map::new();
                extra.insert(
                    "reason".into(),
                    Value::from("result does not match the declared type"),
                );
                if let Some(result) = logged_result {
                    extra.insert("result".into(), result);
                }
                return Err(inv.fail(
                    GatewayError::ResultValidation {
                        command: command.to_string(),
                    },
                    AuditCategory::Integrity,
                    extra,
                ));
            }
        };

        let mut extra = Map::new();
        if let Some(params) = logged_params {
            extra.insert("params".into(), params);
        }
        if let Some(result) = logged_result {
            extra.insert("result".into(), result);
        }
        inv.succeed(extra);
        Ok(typed)
    }
}

/// Audit category for a command, from its `prefix:` namespace.
fn category_for(command: &str) -> AuditCategory {
    let prefix = command.split_once(':').map_or("", |(prefix, _)| prefix);
    match prefix {
        "fs" | "file" | "path" | "dialog" => AuditCategory::Filesystem,
        "net" | "http" | "fetch" => AuditCategory::Network,
        "storage" | "store" | "db" => AuditCategory::Storage,
        "auth" | "session" => AuditCategory::Authentication,
        "config" | "settings" => AuditCategory::Configuration,
        _ => AuditCategory::General,
    }
}

/// Value-free description of a JSON value, safe for the audit trail.
fn describe_shape(value: &Value) -> String {
    match value {
        Value::Null => "null".to_string(),
        Value::Bool(_) => "boolean".to_string(),
        Value::Number(_) => "number".to_string(),
        Value::String(_) => "string".to_string(),
        Value::Array(items) => format!("array of {} items", items.len()),
        Value::Object(map) => {
            let keys: Vec<&str> = map.keys().map(String::as_str).collect();
            format!("object with keys [{}]", keys.join(", "))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn categories_follow_command_namespace() {
        assert_eq!(category_for("fs:write_file"), AuditCategory::Filesystem);
        assert_eq!(category_for("net:fetch"), AuditCategory::Network);
        assert_eq!(category_for("storage:get"), AuditCategory::Storage);
        assert_eq!(category_for("greet"), AuditCategory::General);
    }

    #[test]
    fn shapes_never_include_values() {
        assert_eq!(describe_shape(&json!("SECRET")), "string");
        assert_eq!(describe_shape(&json!([1, 2])), "array of 2 items");
        let shape = describe_shape(&json!({"token": "SECRET", "path": "a"}));
        assert_eq!(shape, "object with keys [path, token]");
        assert!(!shape.contains("SECRET"));
    }
}
