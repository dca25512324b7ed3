//! In-memory audit sink with fan-out to backend writers.
//!
//! [`AuditLog`] keeps the most recent `capacity` events in a ring buffer and
//! forwards every event to the registered [`AuditWriter`]s. Recording never
//! fails: a writer error is reported on the `warden::audit::fallback` tracing
//! target and otherwise swallowed.

mod writers;

pub use writers::{ChannelWriter, JsonlFileWriter, TracingWriter};

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use serde_json::{Map, Value};
use std::cell::Cell;
use std::collections::VecDeque;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;
use warden_kernel::audit::{
    AuditCategory, AuditDraft, AuditError, AuditEvent, AuditFilter, AuditLevel, AuditWriter,
};

pub const DEFAULT_AUDIT_CAPACITY: usize = 500;

/// Writers calling back into `record` deeper than this only reach the buffer.
const MAX_WRITER_DEPTH: u32 = 4;

thread_local! {
    static WRITER_DEPTH: Cell<u32> = const { Cell::new(0) };
}

struct Ring {
    events: VecDeque<Arc<AuditEvent>>,
    last_timestamp: Option<DateTime<Utc>>,
}

/// Bounded, append-only audit buffer shared by every component.
///
/// One instance per process, handed out as `Arc<AuditLog>`.
pub struct AuditLog {
    capacity: usize,
    ring: Mutex<Ring>,
    writers: RwLock<Vec<Arc<dyn AuditWriter>>>,
}

/// Shape of [`AuditLog::export_all`].
#[derive(Debug, Serialize)]
pub struct AuditExport<'a> {
    pub exported_at: DateTime<Utc>,
    pub capacity: usize,
    pub events: Vec<&'a AuditEvent>,
}

impl AuditLog {
    /// `capacity` is clamped to at least one event.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            ring: Mutex::new(Ring {
                events: VecDeque::with_capacity(capacity.min(4096)),
                last_timestamp: None,
            }),
            writers: RwLock::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn with_writer(self, writer: Arc<dyn AuditWriter>) -> Self {
        self.writers.write().push(writer);
        self
    }

    pub fn add_writer(&self, writer: Arc<dyn AuditWriter>) {
        self.writers.write().push(writer);
    }

    pub fn writer_names(&self) -> Vec<String> {
        self.writers
            .read()
            .iter()
            .map(|w| w.name().to_string())
            .collect()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.ring.lock().events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Record one event.
    pub fn record(
        &self,
        level: AuditLevel,
        category: AuditCategory,
        message: impl Into<String>,
        source: impl Into<String>,
        context: Option<Map<String, Value>>,
    ) -> Arc<AuditEvent> {
        let mut draft = AuditDraft::new(level, category, message, source);
        draft.context = context;
        self.record_event(draft)
    }

    /// Stamp, buffer and forward a prepared draft.
    pub fn record_event(&self, draft: AuditDraft) -> Arc<AuditEvent> {
        let event = self.push(&mut self.ring.lock(), draft);
        self.forward(&event);
        event
    }

    fn push(&self, ring: &mut Ring, draft: AuditDraft) -> Arc<AuditEvent> {
        let now = Utc::now();
        let timestamp = ring.last_timestamp.map_or(now, |last| last.max(now));
        ring.last_timestamp = Some(timestamp);

        let event = Arc::new(draft.into_event(timestamp));
        ring.events.push_back(Arc::clone(&event));
        while ring.events.len() > self.capacity {
            ring.events.pop_front();
        }
        event
    }

    fn forward(&self, event: &AuditEvent) {
        let depth = WRITER_DEPTH.with(Cell::get);
        if depth >= MAX_WRITER_DEPTH {
            tracing::warn!(
                target: "warden::audit::fallback",
                event_id = %event.id,
                "audit writer recursion limit reached, event kept in buffer only"
            );
            return;
        }

        // Writers may call back into `record`; no lock is held past this.
        let writers: Vec<Arc<dyn AuditWriter>> = self.writers.read().clone();
        if writers.is_empty() {
            return;
        }

        WRITER_DEPTH.with(|d| d.set(depth + 1));
        for writer in &writers {
            match catch_unwind(AssertUnwindSafe(|| writer.write(event))) {
                Ok(Ok(())) => {}
                Ok(Err(err)) => report_writer_failure(writer.name(), event, &err.to_string()),
                Err(_) => report_writer_failure(writer.name(), event, "writer panicked"),
            }
        }
        WRITER_DEPTH.with(|d| d.set(depth));
    }

    /// Copy of the current buffer, oldest first.
    pub fn snapshot(&self) -> Vec<Arc<AuditEvent>> {
        self.ring.lock().events.iter().cloned().collect()
    }

    /// Events matching `filter`, oldest first.
    ///
    /// Iterates a snapshot taken at call time; events recorded afterwards
    /// are not seen until `filter` is called again.
    pub fn filter(&self, filter: AuditFilter) -> impl Iterator<Item = Arc<AuditEvent>> + use<> {
        self.snapshot()
            .into_iter()
            .filter(move |event| filter.matches(event))
    }

    /// Drop every buffered event and leave a warn-level notice in their place.
    ///
    /// Emptying and appending happen under one lock, so a concurrent
    /// `record` lands either before the clear or after the notice.
    pub fn clear(&self) {
        let notice = {
            let mut ring = self.ring.lock();
            let discarded = ring.events.len();
            ring.events.clear();
            let draft = AuditDraft::new(
                AuditLevel::Warn,
                AuditCategory::Configuration,
                "audit buffer cleared",
                "audit_log",
            )
            .with_context("discarded", discarded);
            self.push(&mut ring, draft)
        };
        self.forward(&notice);
    }

    /// Serialize the buffer as a single JSON document.
    pub fn export_all(&self) -> Result<String, AuditError> {
        let events = self.snapshot();
        let export = AuditExport {
            exported_at: Utc::now(),
            capacity: self.capacity,
            events: events.iter().map(Arc::as_ref).collect(),
        };
        Ok(serde_json::to_string_pretty(&export)?)
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(DEFAULT_AUDIT_CAPACITY)
    }
}

impl std::fmt::Debug for AuditLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditLog")
            .field("capacity", &self.capacity)
            .field("len", &self.len())
            .field("writers", &self.writer_names())
            .finish()
    }
}

// Must not call back into `AuditLog::record`.
fn report_writer_failure(writer: &str, event: &AuditEvent, reason: &str) {
    tracing::error!(
        target: "warden::audit::fallback",
        writer,
        event_id = %event.id,
        level = %event.level,
        category = %event.category,
        source = %event.source,
        reason,
        "audit writer failed"
    );
}
