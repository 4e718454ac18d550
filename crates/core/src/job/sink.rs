use std::io::Write;
use std::sync::Mutex;

use crate::job::messages::{JobStatus, WorkerMessage};
use crate::progress::ProgressSample;

/// Explicit writer interface injected into the worker.
///
/// All worker output flows through this trait instead of any process-wide
/// stream, so the same pipeline code serves the piped worker process, the
/// in-process CLI run, and tests.
pub trait JobSink: Send + Sync {
    /// Append an unstructured, human-readable line to the log channel.
    fn log(&self, line: &str);
    /// Report a progress sample (media seconds or estimated MB).
    fn progress(&self, sample: ProgressSample);
    /// Report a status transition.
    fn status(&self, status: JobStatus);
}

/// Writes the line-delimited JSON worker protocol to stdout.
///
/// Used when the worker runs as a child process of the coordinator. The
/// mutex serializes whole lines; the estimator thread and the main worker
/// task both write here.
pub struct PipeSink {
    out: Mutex<std::io::Stdout>,
}

impl PipeSink {
    pub fn new() -> Self {
        Self {
            out: Mutex::new(std::io::stdout()),
        }
    }

    fn send(&self, message: &WorkerMessage) {
        // A controller that went away is not our problem; drop the line.
        if let Ok(json) = serde_json::to_string(message) {
            let mut out = self.out.lock().unwrap();
            let _ = writeln!(out, "{json}");
            let _ = out.flush();
        }
    }
}

impl Default for PipeSink {
    fn default() -> Self {
        Self::new()
    }
}

impl JobSink for PipeSink {
    fn log(&self, line: &str) {
        self.send(&WorkerMessage::Log {
            line: line.to_string(),
        });
    }

    fn progress(&self, sample: ProgressSample) {
        self.send(&WorkerMessage::Progress { sample });
    }

    fn status(&self, status: JobStatus) {
        self.send(&WorkerMessage::Status { status });
    }
}

/// Silent sink that discards all messages. For tests and for callers that
/// only care about the worker's return value.
pub struct NullSink;

impl JobSink for NullSink {
    fn log(&self, _line: &str) {}
    fn progress(&self, _sample: ProgressSample) {}
    fn status(&self, _status: JobStatus) {}
}
