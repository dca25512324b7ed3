//! Per-invocation audit bookkeeping.

use crate::audit::AuditLog;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;
use warden_kernel::audit::{AuditCategory, AuditDraft, AuditLevel, AuditOutcome};
use warden_kernel::gateway::{GatewayError, Stage};

/// Tracks one run of a gateway call and guarantees it ends with exactly one
/// terminal audit event.
///
/// If the owning future is dropped before [`fail`](Self::fail) or
/// [`succeed`](Self::succeed) ran, `Drop` records a `cancelled` outcome.
pub(super) struct Invocation {
    audit: Arc<AuditLog>,
    command: String,
    category: AuditCategory,
    id: Uuid,
    started: Instant,
    stage: Stage,
    finished: bool,
}

impl Invocation {
    pub(super) fn start(audit: Arc<AuditLog>, command: &str, category: AuditCategory) -> Self {
        let id = Uuid::new_v4();
        tracing::debug!(command = %command, invocation_id = %id, "gateway invocation started");
        Self {
            audit,
            command: command.to_string(),
            category,
            id,
            started: Instant::now(),
            stage: Stage::Validating,
            finished: false,
        }
    }

    pub(super) fn id(&self) -> Uuid {
        self.id
    }

    pub(super) fn advance(&mut self, stage: Stage) {
        self.stage = stage;
        tracing::debug!(
            command = %self.command,
            invocation_id = %self.id,
            stage = stage.as_str(),
            "gateway stage"
        );
    }

    fn context(&self) -> Map<String, Value> {
        let mut context = Map::new();
        context.insert("invocation_id".into(), Value::from(self.id.to_string()));
        context.insert("stage".into(), Value::from(self.stage.as_str()));
        context.insert(
            "elapsed_ms".into(),
            Value::from(self.started.elapsed().as_millis() as u64),
        );
        context
    }

    /// Non-terminal warn event tied to this invocation.
    pub(super) fn warn(&self, category: AuditCategory, message: &str, extra: Map<String, Value>) {
        let mut context = self.context();
        context.extend(extra);
        self.audit.record_event(
            AuditDraft::new(AuditLevel::Warn, category, message, self.command.as_str())
                .with_context_map(context),
        );
    }

    /// Record the terminal failure event and hand the error back.
    pub(super) fn fail(
        &mut self,
        error: GatewayError,
        category: AuditCategory,
        extra: Map<String, Value>,
    ) -> GatewayError {
        let level = match error.outcome() {
            AuditOutcome::Cancelled => AuditLevel::Warn,
            _ => AuditLevel::Error,
        };
        self.finish(level, category, error.to_string(), error.outcome(), extra);
        error
    }

    pub(super) fn succeed(&mut self, extra: Map<String, Value>) {
        self.advance(Stage::Succeeded);
        let message = format!("'{}' succeeded", self.command);
        self.finish(
            AuditLevel::Info,
            self.category,
            message,
            AuditOutcome::Succeeded,
            extra,
        );
    }

    fn finish(
        &mut self,
        level: AuditLevel,
        category: AuditCategory,
        message: String,
        outcome: AuditOutcome,
        extra: Map<String, Value>,
    ) {
        if self.finished {
            return;
        }
        self.finished = true;

        let mut context = self.context();
        context.extend(extra);
        self.audit.record_event(
            AuditDraft::new(level, category, message, self.command.as_str())
                .with_context_map(context)
                .with_outcome(outcome),
        );
        tracing::debug!(
            command = %self.command,
            invocation_id = %self.id,
            outcome = %outcome,
            "gateway invocation finished"
        );
    }
}

impl Drop for Invocation {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let mut extra = Map::new();
        extra.insert("reason".into(), Value::from("dropped before completion"));
        let message = format!("invocation of '{}' was cancelled", self.command);
        self.finish(
            AuditLevel::Warn,
            self.category,
            message,
            AuditOutcome::Cancelled,
            extra,
        );
    }
}
