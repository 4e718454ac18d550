//! Spawns and supervises the transcription worker process.
//!
//! The engine runs in a separate process so that forced cancellation is a
//! plain kill: no half-torn-down native inference state ever lives in the
//! controller. The worker writes the line-delimited JSON protocol from
//! [`crate::job::messages`] on stdout; a pump thread demultiplexes it into
//! three channels the controller drains at its own pace.

use std::io::{BufRead, BufReader, Read, Write};
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};
use thiserror::Error;

use crate::job::config::JobConfig;
use crate::job::messages::{JobStatus, WorkerMessage};
use crate::job::sink::PipeSink;
use crate::job::worker;
use crate::progress::ProgressSample;
use crate::recognition::infrastructure::whisper_engine::WhisperProvider;

/// Hidden argv marker that turns any of our binaries into the worker.
const WORKER_FLAG: &str = "--srt-worker";

#[derive(Error, Debug)]
pub enum CoordinatorError {
    #[error("could not locate own executable: {0}")]
    Executable(#[source] std::io::Error),
    #[error("failed to spawn worker process: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("failed to hand job to worker: {0}")]
    Handoff(#[source] std::io::Error),
    #[error("failed to encode job: {0}")]
    Encode(#[from] serde_json::Error),
}

/// True when this process was started as a worker. Binaries check this
/// before doing anything else and divert into [`run_worker`].
pub fn worker_requested() -> bool {
    std::env::args().nth(1).as_deref() == Some(WORKER_FLAG)
}

/// Worker-process entry point: read one [`JobConfig`] from stdin, run it,
/// and report through the stdout pipe. Returns the process exit code.
pub fn run_worker() -> i32 {
    let sink = Arc::new(PipeSink::new());

    let mut raw = String::new();
    if let Err(err) = std::io::stdin().read_to_string(&mut raw) {
        log::error!("Could not read job from stdin: {err}");
        return 1;
    }
    let config: JobConfig = match serde_json::from_str(&raw) {
        Ok(config) => config,
        Err(err) => {
            log::error!("Malformed job: {err}");
            return 1;
        }
    };

    match worker::run(&config, &WhisperProvider, sink) {
        Ok(_) => 0,
        Err(err) => {
            log::error!("Job failed: {err}");
            1
        }
    }
}

/// A running worker process and the channels its output is demuxed into.
pub struct JobHandle {
    child: Child,
    log_rx: Receiver<String>,
    progress_rx: Receiver<ProgressSample>,
    status_rx: Receiver<JobStatus>,
    pump: Option<thread::JoinHandle<()>>,
}

/// Launch a worker for `config` by re-invoking the current executable with
/// the worker flag. The config crosses over stdin, closed immediately so the
/// worker sees EOF.
pub fn submit(config: &JobConfig) -> Result<JobHandle, CoordinatorError> {
    let exe = std::env::current_exe().map_err(CoordinatorError::Executable)?;
    let mut child = Command::new(exe)
        .arg(WORKER_FLAG)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .spawn()
        .map_err(CoordinatorError::Spawn)?;

    let payload = serde_json::to_string(config)?;
    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(payload.as_bytes())
            .map_err(CoordinatorError::Handoff)?;
    }

    Ok(JobHandle::attach(child))
}

impl JobHandle {
    fn attach(mut child: Child) -> Self {
        let (log_tx, log_rx) = unbounded();
        let (progress_tx, progress_rx) = unbounded();
        let (status_tx, status_rx) = unbounded();

        let stdout = child.stdout.take();
        let pump = thread::spawn(move || {
            let Some(stdout) = stdout else {
                return;
            };
            for line in BufReader::new(stdout).lines() {
                let Ok(line) = line else {
                    break;
                };
                dispatch(&line, &log_tx, &progress_tx, &status_tx);
            }
        });

        Self {
            child,
            log_rx,
            progress_rx,
            status_rx,
            pump: Some(pump),
        }
    }

    pub fn logs(&self) -> &Receiver<String> {
        &self.log_rx
    }

    pub fn progress(&self) -> &Receiver<ProgressSample> {
        &self.progress_rx
    }

    pub fn status(&self) -> &Receiver<JobStatus> {
        &self.status_rx
    }

    /// True while the worker process has not exited.
    pub fn is_alive(&mut self) -> bool {
        matches!(self.child.try_wait(), Ok(None))
    }

    /// Force-terminate the worker and reap it. Safe at any point in the job
    /// and on an already-exited worker; leftover temp directories are swept
    /// by the next worker start. Buffered protocol lines stay readable from
    /// the receivers after this returns.
    pub fn cancel(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

impl Drop for JobHandle {
    fn drop(&mut self) {
        // A handle dropped mid-job must not orphan the worker.
        if matches!(self.child.try_wait(), Ok(None)) {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
        if let Some(pump) = self.pump.take() {
            let _ = pump.join();
        }
    }
}

/// Route one protocol line to its channel. Anything that does not parse as a
/// [`WorkerMessage`] is treated as a stray log line rather than dropped.
fn dispatch(
    line: &str,
    log_tx: &Sender<String>,
    progress_tx: &Sender<ProgressSample>,
    status_tx: &Sender<JobStatus>,
) {
    match serde_json::from_str::<WorkerMessage>(line) {
        Ok(WorkerMessage::Log { line }) => {
            let _ = log_tx.send(line);
        }
        Ok(WorkerMessage::Progress { sample }) => {
            let _ = progress_tx.send(sample);
        }
        Ok(WorkerMessage::Status { status }) => {
            let _ = status_tx.send(status);
        }
        Err(_) => {
            let _ = log_tx.send(line.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channels() -> (
        (Sender<String>, Receiver<String>),
        (Sender<ProgressSample>, Receiver<ProgressSample>),
        (Sender<JobStatus>, Receiver<JobStatus>),
    ) {
        (unbounded(), unbounded(), unbounded())
    }

    #[test]
    fn test_dispatch_routes_each_kind() {
        let ((log_tx, log_rx), (progress_tx, progress_rx), (status_tx, status_rx)) = channels();

        dispatch(
            r#"{"kind":"log","line":"loading"}"#,
            &log_tx,
            &progress_tx,
            &status_tx,
        );
        dispatch(
            r#"{"kind":"progress","sample":{"current":3,"total":9}}"#,
            &log_tx,
            &progress_tx,
            &status_tx,
        );
        dispatch(
            r#"{"kind":"status","status":{"state":"finished"}}"#,
            &log_tx,
            &progress_tx,
            &status_tx,
        );

        assert_eq!(log_rx.try_recv().unwrap(), "loading");
        assert_eq!(progress_rx.try_recv().unwrap(), ProgressSample::new(3, 9));
        assert_eq!(status_rx.try_recv().unwrap(), JobStatus::Finished);
    }

    #[test]
    fn test_dispatch_forwards_unparseable_lines_as_logs() {
        let ((log_tx, log_rx), (progress_tx, _progress_rx), (status_tx, _status_rx)) = channels();

        dispatch("not json at all", &log_tx, &progress_tx, &status_tx);
        dispatch(r#"{"kind":"unknown"}"#, &log_tx, &progress_tx, &status_tx);

        assert_eq!(log_rx.try_recv().unwrap(), "not json at all");
        assert_eq!(log_rx.try_recv().unwrap(), r#"{"kind":"unknown"}"#);
    }

    #[cfg(unix)]
    #[test]
    fn test_cancel_kills_running_child() {
        let child = Command::new("sleep")
            .arg("30")
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let mut handle = JobHandle::attach(child);

        assert!(handle.is_alive());
        let started = std::time::Instant::now();
        handle.cancel();
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }

    #[cfg(unix)]
    #[test]
    fn test_is_alive_reflects_natural_exit() {
        let child = Command::new("true").stdout(Stdio::piped()).spawn().unwrap();
        let mut handle = JobHandle::attach(child);

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        while handle.is_alive() && std::time::Instant::now() < deadline {
            thread::sleep(std::time::Duration::from_millis(20));
        }
        assert!(!handle.is_alive());
    }

    #[cfg(unix)]
    #[test]
    fn test_pump_drains_child_stdout() {
        let child = Command::new("sh")
            .arg("-c")
            .arg(r#"printf '{"kind":"log","line":"from child"}\n'"#)
            .stdout(Stdio::piped())
            .spawn()
            .unwrap();
        let handle = JobHandle::attach(child);

        let line = handle
            .logs()
            .recv_timeout(std::time::Duration::from_secs(5))
            .unwrap();
        assert_eq!(line, "from child");
    }
}
