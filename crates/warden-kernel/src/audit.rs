//! Audit event contract.
//!
//! An [`AuditEvent`] is the immutable record of one security-relevant
//! occurrence. The sink that buffers them lives in `warden-runtime`; this
//! module only fixes the vocabulary (levels, categories, terminal outcomes),
//! the query shape ([`AuditFilter`]) and the [`AuditWriter`] seam for
//! backends.
//!
//! Context payloads must never carry raw secret material. Callers redact
//! before recording.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

// ─────────────────────────────────────────────────────────────────────────────
// Vocabulary
// ─────────────────────────────────────────────────────────────────────────────

/// Severity of an audit event. Ordered: `Info < Warn < Error < Critical`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditLevel {
    Info,
    Warn,
    Error,
    Critical,
}

impl fmt::Display for AuditLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Critical => "critical",
        })
    }
}

/// Closed set of audit categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditCategory {
    Authentication,
    Authorization,
    Filesystem,
    Network,
    Storage,
    Validation,
    Integrity,
    Configuration,
    General,
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Authentication => "authentication",
            Self::Authorization => "authorization",
            Self::Filesystem => "filesystem",
            Self::Network => "network",
            Self::Storage => "storage",
            Self::Validation => "validation",
            Self::Integrity => "integrity",
            Self::Configuration => "configuration",
            Self::General => "general",
        })
    }
}

/// Terminal state of one gateway invocation.
///
/// Exactly one event per invocation carries `Some(outcome)`; every other
/// event has `outcome: None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditOutcome {
    Succeeded,
    ValidationFailed,
    CapabilityDenied,
    InvocationFailed,
    ResultRejected,
    Cancelled,
}

impl AuditOutcome {
    /// `true` for every outcome except [`AuditOutcome::Succeeded`].
    pub fn is_failure(self) -> bool {
        !matches!(self, Self::Succeeded)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Succeeded => "succeeded",
            Self::ValidationFailed => "validation_failed",
            Self::CapabilityDenied => "capability_denied",
            Self::InvocationFailed => "invocation_failed",
            Self::ResultRejected => "result_rejected",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuditEvent
// ─────────────────────────────────────────────────────────────────────────────

/// Fields supplied by the recorder. The sink stamps `id` and `timestamp`.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditDraft {
    pub level: AuditLevel,
    pub category: AuditCategory,
    pub message: String,
    pub source: String,
    pub context: Option<Map<String, Value>>,
    pub outcome: Option<AuditOutcome>,
}

impl AuditDraft {
    pub fn new(
        level: AuditLevel,
        category: AuditCategory,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            level,
            category,
            message: message.into(),
            source: source.into(),
            context: None,
            outcome: None,
        }
    }

    /// Builder: add one context entry.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.context
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    /// Builder: replace the whole context map.
    pub fn with_context_map(mut self, context: Map<String, Value>) -> Self {
        self.context = Some(context);
        self
    }

    /// Builder: mark this event as the terminal event of an invocation.
    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = Some(outcome);
        self
    }

    /// Stamp the draft into an immutable event.
    pub fn into_event(self, timestamp: DateTime<Utc>) -> AuditEvent {
        AuditEvent {
            id: Uuid::new_v4(),
            timestamp,
            level: self.level,
            category: self.category,
            message: self.message,
            source: self.source,
            context: self.context,
            outcome: self.outcome,
        }
    }
}

/// Immutable record of a security-relevant occurrence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEvent {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: AuditLevel,
    pub category: AuditCategory,
    pub message: String,
    /// Component or call site that emitted the event.
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<AuditOutcome>,
}

impl AuditEvent {
    /// `true` if this event marks the end of a gateway invocation.
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Look up one context entry.
    pub fn context_value(&self, key: &str) -> Option<&Value> {
        self.context.as_ref().and_then(|c| c.get(key))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// AuditFilter
// ─────────────────────────────────────────────────────────────────────────────

/// Query criteria over retained events. Every set field must match.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    /// Exact level.
    pub level: Option<AuditLevel>,
    /// Level at or above.
    pub min_level: Option<AuditLevel>,
    pub category: Option<AuditCategory>,
    pub source: Option<String>,
    /// Inclusive lower bound.
    pub since: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub until: Option<DateTime<Utc>>,
    pub terminal_only: bool,
}

impl AuditFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn level(mut self, level: AuditLevel) -> Self {
        self.level = Some(level);
        self
    }

    pub fn min_level(mut self, level: AuditLevel) -> Self {
        self.min_level = Some(level);
        self
    }

    pub fn category(mut self, category: AuditCategory) -> Self {
        self.category = Some(category);
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn between(mut self, since: DateTime<Utc>, until: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self.until = Some(until);
        self
    }

    pub fn terminal_only(mut self) -> Self {
        self.terminal_only = true;
        self
    }

    pub fn matches(&self, event: &AuditEvent) -> bool {
        self.level.is_none_or(|l| event.level == l)
            && self.min_level.is_none_or(|l| event.level >= l)
            && self.category.is_none_or(|c| event.category == c)
            && self.source.as_deref().is_none_or(|s| event.source == s)
            && self.since.is_none_or(|t| event.timestamp >= t)
            && self.until.is_none_or(|t| event.timestamp <= t)
            && (!self.terminal_only || event.is_terminal())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Writers
// ─────────────────────────────────────────────────────────────────────────────

/// Failure of a single backend writer. Never surfaces past the sink.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AuditError {
    #[error("audit writer '{writer}' failed: {reason}")]
    WriteFailed { writer: String, reason: String },

    #[error("audit I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Backend that receives every recorded event (console, file, remote, …).
///
/// Called synchronously on the recording thread. Writers that ship events
/// asynchronously hand them to a channel.
pub trait AuditWriter: Send + Sync {
    /// Stable identifier used in fallback diagnostics.
    fn name(&self) -> &str;

    fn write(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn event(level: AuditLevel, category: AuditCategory, source: &str) -> AuditEvent {
        AuditDraft::new(level, category, "m", source).into_event(Utc::now())
    }

    #[test]
    fn levels_are_ordered() {
        assert!(AuditLevel::Info < AuditLevel::Warn);
        assert!(AuditLevel::Error < AuditLevel::Critical);
    }

    #[test]
    fn draft_builds_context_and_outcome() {
        let ev = AuditDraft::new(AuditLevel::Info, AuditCategory::General, "done", "cmd")
            .with_context("stage", "invoking")
            .with_outcome(AuditOutcome::Succeeded)
            .into_event(Utc::now());
        assert!(ev.is_terminal());
        assert_eq!(ev.context_value("stage"), Some(&Value::from("invoking")));
    }

    #[test]
    fn filter_matches_all_set_fields() {
        let ev = event(AuditLevel::Error, AuditCategory::Validation, "fs:write");
        assert!(AuditFilter::new().matches(&ev));
        assert!(AuditFilter::new().level(AuditLevel::Error).matches(&ev));
        assert!(AuditFilter::new().min_level(AuditLevel::Warn).matches(&ev));
        assert!(!AuditFilter::new().min_level(AuditLevel::Critical).matches(&ev));
        assert!(!AuditFilter::new().category(AuditCategory::Network).matches(&ev));
        assert!(AuditFilter::new().source("fs:write").matches(&ev));
        assert!(!AuditFilter::new().terminal_only().matches(&ev));

        let now = ev.timestamp;
        assert!(
            AuditFilter::new()
                .between(now - Duration::seconds(1), now)
                .matches(&ev)
        );
        assert!(
            !AuditFilter::new()
                .between(now + Duration::seconds(1), now + Duration::seconds(2))
                .matches(&ev)
        );
    }

    #[test]
    fn event_serializes_snake_case() {
        let ev = AuditDraft::new(AuditLevel::Warn, AuditCategory::Authorization, "x", "y")
            .with_outcome(AuditOutcome::CapabilityDenied)
            .into_event(Utc::now());
        let json = serde_json::to_value(&ev).unwrap();
        assert_eq!(json["level"], "warn");
        assert_eq!(json["category"], "authorization");
        assert_eq!(json["outcome"], "capability_denied");
        assert!(json.get("context").is_none());
    }

    #[test]
    fn writer_trait_is_object_safe() {
        fn _takes(_: Box<dyn AuditWriter>) {}
    }
}
