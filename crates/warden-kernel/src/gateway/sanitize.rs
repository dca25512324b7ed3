//! Parameter sanitizer seam.

use serde_json::Value;

/// Output of a sanitizer pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sanitized {
    pub value: Value,
    /// Names of suspicious patterns that were neutralised. Non-empty means
    /// the gateway records a warn-level event; the call still proceeds.
    pub suspicious: Vec<String>,
}

impl Sanitized {
    pub fn clean(value: Value) -> Self {
        Self {
            value,
            suspicious: Vec::new(),
        }
    }
}

/// Pure, total transform applied to parameters after validation and before
/// the capability gate. Must not panic.
pub trait ParamSanitizer: Send + Sync {
    fn sanitize(&self, value: Value) -> Sanitized;
}

impl<F> ParamSanitizer for F
where
    F: Fn(Value) -> Value + Send + Sync,
{
    fn sanitize(&self, value: Value) -> Sanitized {
        Sanitized::clean(self(value))
    }
}
