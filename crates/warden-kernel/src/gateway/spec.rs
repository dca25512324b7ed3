//! Declarative definition of one privileged callable.

use super::error::GatewayError;
use super::sanitize::ParamSanitizer;
use crate::validation::Validator;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

/// Definition of one privileged operation, created once and shared by every
/// invocation of it.
///
/// `P` is the typed parameter the caller passes, `R` the typed result it gets
/// back. Both cross the boundary as `serde_json::Value`.
///
/// `log_params` and `log_result` default to `false`: raw values may carry
/// secrets and are kept out of the audit trail unless explicitly opted in.
pub struct GatewayCallSpec<P, R> {
    /// Command identifier, unique per call site.
    pub command: String,
    pub validate_params: Option<Validator>,
    pub validate_result: Option<Validator>,
    pub sanitize_params: Option<Arc<dyn ParamSanitizer>>,
    pub required_capabilities: Vec<String>,
    pub log_params: bool,
    pub log_result: bool,
    /// Upper bound on the invocation step. `None` defers to the gateway
    /// default.
    pub timeout: Option<Duration>,
    _types: PhantomData<fn(P) -> R>,
}

impl<P, R> GatewayCallSpec<P, R> {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            validate_params: None,
            validate_result: None,
            sanitize_params: None,
            required_capabilities: Vec::new(),
            log_params: false,
            log_result: false,
            timeout: None,
            _types: PhantomData,
        }
    }

    #[must_use]
    pub fn with_param_validator(mut self, validator: Validator) -> Self {
        self.validate_params = Some(validator);
        self
    }

    #[must_use]
    pub fn with_result_validator(mut self, validator: Validator) -> Self {
        self.validate_result = Some(validator);
        self
    }

    #[must_use]
    pub fn with_sanitizer(mut self, sanitizer: Arc<dyn ParamSanitizer>) -> Self {
        self.sanitize_params = Some(sanitizer);
        self
    }

    /// Builder: add one required capability.
    #[must_use]
    pub fn require(mut self, capability: impl Into<String>) -> Self {
        self.required_capabilities.push(capability.into());
        self
    }

    #[must_use]
    pub fn with_required_capabilities<I, S>(mut self, capabilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_capabilities
            .extend(capabilities.into_iter().map(Into::into));
        self
    }

    /// Opt in to raw parameters in audit context.
    #[must_use]
    pub fn log_params(mut self, enabled: bool) -> Self {
        self.log_params = enabled;
        self
    }

    /// Opt in to raw results in audit context.
    #[must_use]
    pub fn log_result(mut self, enabled: bool) -> Self {
        self.log_result = enabled;
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Structural checks run when the spec is built into a callable.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.command.trim().is_empty() {
            return Err(GatewayError::InvalidSpec("command cannot be empty".into()));
        }
        if self
            .required_capabilities
            .iter()
            .any(|c| c.trim().is_empty())
        {
            return Err(GatewayError::InvalidSpec(format!(
                "'{}' lists an empty capability name",
                self.command
            )));
        }
        if self.timeout.is_some_and(|t| t.is_zero()) {
            return Err(GatewayError::InvalidSpec(format!(
                "'{}' has a zero timeout",
                self.command
            )));
        }
        Ok(())
    }
}

impl<P, R> Clone for GatewayCallSpec<P, R> {
    fn clone(&self) -> Self {
        Self {
            command: self.command.clone(),
            validate_params: self.validate_params.clone(),
            validate_result: self.validate_result.clone(),
            sanitize_params: self.sanitize_params.clone(),
            required_capabilities: self.required_capabilities.clone(),
            log_params: self.log_params,
            log_result: self.log_result,
            timeout: self.timeout,
            _types: PhantomData,
        }
    }
}

impl<P, R> fmt::Debug for GatewayCallSpec<P, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayCallSpec")
            .field("command", &self.command)
            .field("validate_params", &self.validate_params.is_some())
            .field("validate_result", &self.validate_result.is_some())
            .field("sanitize_params", &self.sanitize_params.is_some())
            .field("required_capabilities", &self.required_capabilities)
            .field("log_params", &self.log_params)
            .field("log_result", &self.log_result)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::validator;

    #[test]
    fn logging_flags_default_off() {
        let spec = GatewayCallSpec::<(), ()>::new("greet");
        assert!(!spec.log_params);
        assert!(!spec.log_result);
        assert!(spec.required_capabilities.is_empty());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn builder_collects_capabilities() {
        let spec = GatewayCallSpec::<(), ()>::new("fs:copy")
            .require("fs:read")
            .with_required_capabilities(["fs:write"])
            .with_param_validator(validator(|v| v.is_object()));
        assert_eq!(spec.required_capabilities, vec!["fs:read", "fs:write"]);
        assert!(spec.validate_params.is_some());
    }

    #[test]
    fn malformed_specs_rejected() {
        assert!(matches!(
            GatewayCallSpec::<(), ()>::new(" ").validate(),
            Err(GatewayError::InvalidSpec(_))
        ));
        assert!(
            GatewayCallSpec::<(), ()>::new("x")
                .require("")
                .validate()
                .is_err()
        );
        assert!(
            GatewayCallSpec::<(), ()>::new("x")
                .with_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn debug_hides_closures() {
        let spec = GatewayCallSpec::<(), ()>::new("x").with_param_validator(validator(|_| true));
        let dbg = format!("{spec:?}");
        assert!(dbg.contains("validate_params: true"));
    }
}
