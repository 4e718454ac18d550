use serde::{Deserialize, Serialize};

use crate::progress::ProgressSample;

/// Lifecycle of one job.
///
/// `Idle` is the controller's initial state and never crosses the wire.
/// `Cancelled` is also controller-derived: a force-killed worker does not
/// get to send a farewell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    Idle,
    /// Model acquisition/loading is in progress.
    Loading,
    /// Working on file `index` of `total` (1-based).
    Processing {
        index: usize,
        total: usize,
        file: String,
    },
    Finished,
    Error { message: String },
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Finished | JobStatus::Error { .. } | JobStatus::Cancelled
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            JobStatus::Idle => write!(f, "Ready"),
            JobStatus::Loading => write!(f, "Loading model..."),
            JobStatus::Processing { index, total, file } => {
                write!(f, "Processing {index}/{total}: {file}")
            }
            JobStatus::Finished => write!(f, "Finished"),
            JobStatus::Error { message } => write!(f, "Error: {message}"),
            JobStatus::Cancelled => write!(f, "Stopped"),
        }
    }
}

/// One message on the worker → controller wire.
///
/// Serialized as one JSON object per line on the worker's stdout; the
/// coordinator demuxes each variant onto its own channel, so ordering is
/// only guaranteed within a variant. Every message therefore carries enough
/// context (file name, index) to be rendered on its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerMessage {
    Log { line: String },
    Progress { sample: ProgressSample },
    Status { status: JobStatus },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        let status = JobStatus::Processing {
            index: 2,
            total: 5,
            file: "clip.mp4".to_string(),
        };
        let json = serde_json::to_string(&WorkerMessage::Status {
            status: status.clone(),
        })
        .unwrap();
        let back: WorkerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, WorkerMessage::Status { status });
    }

    #[test]
    fn test_progress_round_trip() {
        let msg = WorkerMessage::Progress {
            sample: ProgressSample::new(12, 60),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: WorkerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(back, msg);
    }

    #[test]
    fn test_log_message_is_single_line_json() {
        let msg = WorkerMessage::Log {
            line: "[1/3] Processing: clip.mp4".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        assert!(!json.contains('\n'));
    }

    #[test]
    fn test_terminal_states() {
        assert!(JobStatus::Finished.is_terminal());
        assert!(JobStatus::Error {
            message: "x".into()
        }
        .is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Loading.is_terminal());
        assert!(!JobStatus::Idle.is_terminal());
    }
}
