//! Built-in [`AuditWriter`] backends.

use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use warden_kernel::audit::{AuditError, AuditEvent, AuditLevel, AuditWriter};

/// Mirrors audit events into the `tracing` pipeline on the `warden::audit`
/// target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingWriter;

impl AuditWriter for TracingWriter {
    fn name(&self) -> &str {
        "tracing"
    }

    fn write(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let context = event
            .context
            .as_ref()
            .map(|c| serde_json::Value::Object(c.clone()).to_string())
            .unwrap_or_default();
        let outcome = event.outcome.map(|o| o.to_string()).unwrap_or_default();

        match event.level {
            AuditLevel::Info => tracing::info!(
                target: "warden::audit",
                category = %event.category,
                source = %event.source,
                outcome = %outcome,
                context = %context,
                "{}", event.message
            ),
            AuditLevel::Warn => tracing::warn!(
                target: "warden::audit",
                category = %event.category,
                source = %event.source,
                outcome = %outcome,
                context = %context,
                "{}", event.message
            ),
            AuditLevel::Error => tracing::error!(
                target: "warden::audit",
                category = %event.category,
                source = %event.source,
                outcome = %outcome,
                context = %context,
                "{}", event.message
            ),
            AuditLevel::Critical => tracing::error!(
                target: "warden::audit",
                critical = true,
                category = %event.category,
                source = %event.source,
                outcome = %outcome,
                context = %context,
                "{}", event.message
            ),
        }
        Ok(())
    }
}

/// Appends one JSON object per line to a file.
pub struct JsonlFileWriter {
    path: PathBuf,
    out: Mutex<BufWriter<File>>,
}

impl JsonlFileWriter {
    /// Open `path` for appending, creating it if needed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            out: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditWriter for JsonlFileWriter {
    fn name(&self) -> &str {
        "jsonl"
    }

    fn write(&self, event: &AuditEvent) -> Result<(), AuditError> {
        let line = serde_json::to_vec(event)?;
        let mut out = self.out.lock();
        out.write_all(&line)?;
        out.write_all(b"\n")?;
        out.flush()?;
        Ok(())
    }
}

impl std::fmt::Debug for JsonlFileWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonlFileWriter")
            .field("path", &self.path)
            .finish()
    }
}

/// Hands events to an async consumer (remote shipper, UI feed, ...).
///
/// A dropped receiver turns every write into [`AuditError::WriteFailed`].
#[derive(Debug, Clone)]
pub struct ChannelWriter {
    tx: mpsc::UnboundedSender<AuditEvent>,
}

impl ChannelWriter {
    pub fn new(tx: mpsc::UnboundedSender<AuditEvent>) -> Self {
        Self { tx }
    }

    /// Writer plus the receiving half.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<AuditEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }
}

impl AuditWriter for ChannelWriter {
    fn name(&self) -> &str {
        "channel"
    }

    fn write(&self, event: &AuditEvent) -> Result<(), AuditError> {
        self.tx
            .send(event.clone())
            .map_err(|_| AuditError::WriteFailed {
                writer: self.name().to_string(),
                reason: "receiver dropped".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use warden_kernel::audit::{AuditCategory, AuditDraft, AuditOutcome};

    fn sample() -> AuditEvent {
        AuditDraft::new(AuditLevel::Info, AuditCategory::Filesystem, "read", "fs:read")
            .with_context("stage", "succeeded")
            .with_outcome(AuditOutcome::Succeeded)
            .into_event(Utc::now())
    }

    #[test]
    fn jsonl_appends_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");

        let writer = JsonlFileWriter::open(&path).unwrap();
        writer.write(&sample()).unwrap();
        writer.write(&sample()).unwrap();
        drop(writer);

        // Reopening appends instead of truncating.
        JsonlFileWriter::open(&path).unwrap().write(&sample()).unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        let parsed: AuditEvent = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.source, "fs:read");
        assert_eq!(parsed.outcome, Some(AuditOutcome::Succeeded));
    }

    #[test]
    fn jsonl_open_fails_for_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = JsonlFileWriter::open(dir.path().join("nope").join("audit.jsonl"));
        assert!(matches!(result, Err(AuditError::Io(_))));
    }

    #[tokio::test]
    async fn channel_forwards_until_receiver_drops() {
        let (writer, mut rx) = ChannelWriter::channel();
        writer.write(&sample()).unwrap();
        assert_eq!(rx.recv().await.unwrap().message, "read");

        drop(rx);
        assert!(matches!(
            writer.write(&sample()),
            Err(AuditError::WriteFailed { .. })
        ));
    }

    #[test]
    fn tracing_writer_never_fails() {
        let writer = TracingWriter;
        for level in [
            AuditLevel::Info,
            AuditLevel::Warn,
            AuditLevel::Error,
            AuditLevel::Critical,
        ] {
            let mut event = sample();
            event.level = level;
            assert!(writer.write(&event).is_ok());
        }
    }
}
