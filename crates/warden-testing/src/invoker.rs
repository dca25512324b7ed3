use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use warden_kernel::gateway::{InvokeError, PrivilegedCallInvoker};

type Responder = Arc<dyn Fn(&Value) -> Result<Value, InvokeError> + Send + Sync>;

fn responder<F>(f: F) -> Responder
where
    F: Fn(&Value) -> Result<Value, InvokeError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// In-memory [`PrivilegedCallInvoker`] with canned responses.
///
/// Commands without a configured response fail with
/// [`InvokeError::UnknownCommand`] unless a fallback is set.
#[derive(Clone, Default)]
pub struct MockInvoker {
    responders: HashMap<String, Responder>,
    fallback: Option<Responder>,
    delay: Option<Duration>,
    /// Every `(command, params)` received, in order.
    pub history: Arc<RwLock<Vec<(String, Value)>>>,
}

impl MockInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `command` with `response`.
    pub fn with_response(mut self, command: impl Into<String>, response: Value) -> Self {
        self.responders
            .insert(command.into(), responder(move |_| Ok(response.clone())));
        self
    }

    /// Fail `command` with `error`.
    pub fn with_error(mut self, command: impl Into<String>, error: InvokeError) -> Self {
        self.responders
            .insert(command.into(), responder(move |_| Err(error.clone())));
        self
    }

    /// Compute the answer for `command` from its params.
    pub fn with_handler<F>(mut self, command: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<Value, InvokeError> + Send + Sync + 'static,
    {
        self.responders.insert(command.into(), responder(handler));
        self
    }

    /// Echo params back for every unconfigured command.
    pub fn echoing(mut self) -> Self {
        self.fallback = Some(responder(|params| Ok(params.clone())));
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub async fn call_count(&self) -> usize {
        self.history.read().await.len()
    }

    pub async fn calls_to(&self, command: &str) -> usize {
        self.history
            .read()
            .await
            .iter()
            .filter(|(c, _)| c == command)
            .count()
    }

    pub async fn history(&self) -> Vec<(String, Value)> {
        self.history.read().await.clone()
    }

    pub async fn last_params(&self) -> Option<Value> {
        self.history.read().await.last().map(|(_, p)| p.clone())
    }

    pub async fn clear_history(&self) {
        self.history.write().await.clear();
    }
}

#[async_trait]
impl PrivilegedCallInvoker for MockInvoker {
    async fn invoke(&self, command: &str, params: Value) -> Result<Value, InvokeError> {
        self.history
            .write()
            .await
            .push((command.to_string(), params.clone()));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        match self.responders.get(command).or(self.fallback.as_ref()) {
            Some(respond) => respond(&params),
            None => Err(InvokeError::UnknownCommand(command.to_string())),
        }
    }
}
