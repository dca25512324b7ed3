use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use warden_kernel::audit::{AuditError, AuditEvent, AuditWriter};

/// Keeps a copy of every event it receives.
#[derive(Debug, Default)]
pub struct RecordingWriter {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn messages(&self) -> Vec<String> {
        self.events.lock().iter().map(|e| e.message.clone()).collect()
    }
}

impl AuditWriter for RecordingWriter {
    fn name(&self) -> &str {
        "recording"
    }

    fn write(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// Fails every write and counts the attempts.
#[derive(Debug, Default)]
pub struct FailingWriter {
    attempts: AtomicUsize,
}

impl FailingWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl AuditWriter for FailingWriter {
    fn name(&self) -> &str {
        "failing"
    }

    fn write(&self, _event: &AuditEvent) -> Result<(), AuditError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(AuditError::WriteFailed {
            writer: self.name().to_string(),
            reason: "simulated failure".to_string(),
        })
    }
}
