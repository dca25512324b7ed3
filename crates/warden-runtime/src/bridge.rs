//! Channel bridge between the gateway and the privileged side.
//!
//! [`ChannelInvoker`] is the unprivileged half: it implements
//! [`PrivilegedCallInvoker`] by sending [`InvokeRequest`]s down a bounded
//! channel and awaiting the reply. [`CommandRouter`] is the privileged half:
//! it owns the named [`CommandHandler`]s and serves requests, one task per
//! request.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use warden_kernel::gateway::{InvokeError, PrivilegedCallInvoker};

/// One request crossing the bridge.
pub struct InvokeRequest {
    pub command: String,
    pub params: Value,
    pub reply: oneshot::Sender<Result<Value, InvokeError>>,
}

impl fmt::Debug for InvokeRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // params stay out of debug output
        f.debug_struct("InvokeRequest")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Unprivileged side
// ─────────────────────────────────────────────────────────────────────────────

/// [`PrivilegedCallInvoker`] over a bounded `mpsc` channel.
#[derive(Debug, Clone)]
pub struct ChannelInvoker {
    tx: mpsc::Sender<InvokeRequest>,
}

impl ChannelInvoker {
    pub fn new(tx: mpsc::Sender<InvokeRequest>) -> Self {
        Self { tx }
    }

    /// Invoker plus the receiving half for the privileged side.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<InvokeRequest>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl PrivilegedCallInvoker for ChannelInvoker {
    async fn invoke(&self, command: &str, params: Value) -> Result<Value, InvokeError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(InvokeRequest {
                command: command.to_string(),
                params,
                reply,
            })
            .await
            .map_err(|_| InvokeError::Closed)?;

        response.await.map_err(|_| InvokeError::Closed)?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Privileged side
// ─────────────────────────────────────────────────────────────────────────────

/// A privileged command implementation.
#[async_trait]
pub trait CommandHandler: Send + Sync {
    async fn handle(&self, params: Value) -> Result<Value, InvokeError>;
}

/// Adapter turning an async closure into a [`CommandHandler`].
pub struct FnHandler<F>(F);

/// Wrap `f` as a [`CommandHandler`].
pub fn handler_fn<F, Fut>(f: F) -> Arc<dyn CommandHandler>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, InvokeError>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}

#[async_trait]
impl<F, Fut> CommandHandler for FnHandler<F>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, InvokeError>> + Send + 'static,
{
    async fn handle(&self, params: Value) -> Result<Value, InvokeError> {
        (self.0)(params).await
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum BridgeError {
    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),

    #[error("command '{0}' is not registered")]
    CommandNotFound(String),
}

/// Name → handler table served on the privileged side.
#[derive(Default)]
pub struct CommandRouter {
    handlers: HashMap<String, Arc<dyn CommandHandler>>,
}

impl CommandRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(
        &mut self,
        command: impl Into<String>,
        handler: Arc<dyn CommandHandler>,
    ) -> Result<(), BridgeError> {
        let command = command.into();
        if self.handlers.contains_key(&command) {
            return Err(BridgeError::DuplicateCommand(command));
        }
        self.handlers.insert(command, handler);
        Ok(())
    }

    pub fn deregister(&mut self, command: &str) -> Result<(), BridgeError> {
        self.handlers
            .remove(command)
            .map(|_| ())
            .ok_or_else(|| BridgeError::CommandNotFound(command.to_string()))
    }

    /// Registered command names, sorted.
    pub fn commands(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub async fn dispatch(&self, command: &str, params: Value) -> Result<Value, InvokeError> {
        let handler = self
            .handlers
            .get(command)
            .cloned()
            .ok_or_else(|| InvokeError::UnknownCommand(command.to_string()))?;
        handler.handle(params).await
    }

    /// Serve requests until every sender is dropped.
    pub async fn serve(self: Arc<Self>, mut rx: mpsc::Receiver<InvokeRequest>) {
        while let Some(request) = rx.recv().await {
            let router = Arc::clone(&self);
            tokio::spawn(async move {
                let InvokeRequest {
                    command,
                    params,
                    reply,
                } = request;
                let result = router.dispatch(&command, params).await;
                if reply.send(result).is_err() {
                    tracing::debug!(command = %command, "caller went away before the reply");
                }
            });
        }
        tracing::debug!("command router stopped: all invokers dropped");
    }

    /// Spawn [`serve`](Self::serve) on a fresh channel and return the
    /// matching invoker.
    pub fn spawn(self: Arc<Self>, buffer: usize) -> (ChannelInvoker, JoinHandle<()>) {
        let (invoker, rx) = ChannelInvoker::channel(buffer);
        let handle = tokio::spawn(self.serve(rx));
        (invoker, handle)
    }
}

impl fmt::Debug for CommandRouter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandRouter")
            .field("commands", &self.commands())
            .finish()
    }
}
