//! Status and capture sinks.
//!
//! Status lines ("starting", "still running", "finished") go to a
//! [`StatusSink`]. The full stdout and stderr of every child end up in the two
//! run-wide capture files held by [`OutputSinks`], one bracketed record per
//! task.

use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex as AsyncMutex;

use crate::error::{MpxError, Result};

/// Receiver of human readable progress lines
pub trait StatusSink: Send + Sync {
    fn status(&self, line: &str);
}

/// Status sink that forwards every line to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn status(&self, line: &str) {
        tracing::info!(target: "mpx::status", "{line}");
    }
}

/// Status sink that keeps every line in memory
#[derive(Debug, Default)]
pub struct MemoryStatusSink {
    lines: Mutex<Vec<String>>,
}

impl MemoryStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines.lock().iter().any(|line| line.contains(needle))
    }
}

impl StatusSink for MemoryStatusSink {
    fn status(&self, line: &str) {
        self.lines.lock().push(line.to_string());
    }
}

/// Which capture file a record belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureStream {
    Stdout,
    Stderr,
}

/// The two run-wide capture files
#[derive(Debug)]
pub struct OutputSinks {
    stdout_path: PathBuf,
    stderr_path: PathBuf,
    stdout: AsyncMutex<File>,
    stderr: AsyncMutex<File>,
}

impl OutputSinks {
    /// Truncate both files and open them for appending; the same path may be
    /// given for both streams
    pub async fn create(stdout_path: &Path, stderr_path: &Path) -> Result<Self> {
        let stdout = open_truncated(stdout_path).await?;
        let stderr = if stderr_path == stdout_path {
            open_append(stderr_path).await?
        } else {
            open_truncated(stderr_path).await?
        };

        Ok(Self {
            stdout_path: stdout_path.to_path_buf(),
            stderr_path: stderr_path.to_path_buf(),
            stdout: AsyncMutex::new(stdout),
            stderr: AsyncMutex::new(stderr),
        })
    }

    pub fn path(&self, stream: CaptureStream) -> &Path {
        match stream {
            CaptureStream::Stdout => &self.stdout_path,
            CaptureStream::Stderr => &self.stderr_path,
        }
    }

    /// Append one task record: starting line, captured text, finishing line
    pub async fn write_record(
        &self,
        stream: CaptureStream,
        starting: &str,
        captured: &str,
        finished: &str,
    ) -> std::io::Result<()> {
        let record = format_record(starting, captured, finished);
        let file = match stream {
            CaptureStream::Stdout => &self.stdout,
            CaptureStream::Stderr => &self.stderr,
        };

        let mut file = file.lock().await;
        file.write_all(record.as_bytes()).await?;
        file.flush().await
    }
}

fn format_record(starting: &str, captured: &str, finished: &str) -> String {
    let mut record = String::with_capacity(starting.len() + captured.len() + finished.len() + 3);
    record.push_str(starting);
    record.push('\n');
    record.push_str(captured);
    if !captured.is_empty() && !captured.ends_with('\n') {
        record.push('\n');
    }
    record.push_str(finished);
    record.push('\n');
    record
}

async fn open_truncated(path: &Path) -> Result<File> {
    File::create(path).await.map_err(|source| MpxError::SinkOpen {
        path: path.to_path_buf(),
        source,
    })?;
    open_append(path).await
}

async fn open_append(path: &Path) -> Result<File> {
    OpenOptions::new()
        .append(true)
        .open(path)
        .await
        .map_err(|source| MpxError::SinkOpen {
            path: path.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        assert_eq!(format_record("start", "hello", "done"), "start\nhello\ndone\n");
        assert_eq!(format_record("start", "hello\n", "done"), "start\nhello\ndone\n");
        assert_eq!(format_record("start", "", "done"), "start\ndone\n");
    }

    #[test]
    fn test_memory_sink_collects_lines() {
        let sink = MemoryStatusSink::new();
        sink.status("one");
        sink.status("two canceled.");
        assert_eq!(sink.lines(), vec!["one", "two canceled."]);
        assert!(sink.contains("canceled"));
        assert!(!sink.contains("three"));
    }

    #[tokio::test]
    async fn test_sinks_truncate_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("_stdout.log");
        let err = dir.path().join("_stderr.log");
        std::fs::write(&out, "stale content\n").unwrap();

        let sinks = OutputSinks::create(&out, &err).await.unwrap();
        sinks
            .write_record(CaptureStream::Stdout, "a starting", "x", "a done")
            .await
            .unwrap();
        sinks
            .write_record(CaptureStream::Stdout, "b starting", "", "b done")
            .await
            .unwrap();
        sinks
            .write_record(CaptureStream::Stderr, "a starting", "oops\n", "a done")
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&out).unwrap(),
            "a starting\nx\na done\nb starting\nb done\n"
        );
        assert_eq!(
            std::fs::read_to_string(&err).unwrap(),
            "a starting\noops\na done\n"
        );
        assert_eq!(sinks.path(CaptureStream::Stderr), err.as_path());
    }

    #[tokio::test]
    async fn test_shared_path_for_both_streams() {
        let dir = tempfile::tempdir().unwrap();
        let both = dir.path().join("all.log");

        let sinks = OutputSinks::create(&both, &both).await.unwrap();
        sinks
            .write_record(CaptureStream::Stdout, "s", "out", "f")
            .await
            .unwrap();
        sinks
            .write_record(CaptureStream::Stderr, "s", "err", "f")
            .await
            .unwrap();

        assert_eq!(
            std::fs::read_to_string(&both).unwrap(),
            "s\nout\nf\ns\nerr\nf\n"
        );
    }

    #[tokio::test]
    async fn test_unwritable_path_is_a_setup_error() {
        let result = OutputSinks::create(
            Path::new("/nonexistent-dir/_stdout.log"),
            Path::new("/nonexistent-dir/_stderr.log"),
        )
        .await;
        assert!(matches!(result, Err(MpxError::SinkOpen { .. })));
    }
}
