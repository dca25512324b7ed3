//! Trust-boundary transport seam.

use super::error::InvokeError;
use async_trait::async_trait;
use serde_json::Value;

/// The mechanism that actually crosses the trust boundary.
///
/// The gateway treats it as an opaque `(command, params) -> result`
/// function. Any `Err` is an invocation failure; the gateway never retries.
#[async_trait]
pub trait PrivilegedCallInvoker: Send + Sync {
    async fn invoke(&self, command: &str, params: Value) -> Result<Value, InvokeError>;
}
