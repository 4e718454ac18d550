use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{bounded, Sender};

use crate::job::sink::JobSink;
use crate::progress::ProgressSample;

/// How often the cache directory is re-measured while the engine load blocks.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Growth below this is treated as noise: the model is presumed cached and
/// merely being loaded into memory.
const NOISE_THRESHOLD_BYTES: u64 = 1024 * 1024;

/// Downloads never report 100% from the heuristic; completion is signalled
/// by the blocking load call actually returning.
const MAX_ESTIMATED_PERCENT: u64 = 99;

/// Heuristic progress for model acquisition, a phase with no native
/// progress callback.
///
/// The estimate is the growth of the model cache directory since the load
/// began, compared against the model's expected download size. This is an
/// approximation, not a measurement: the directory may grow for unrelated
/// reasons, and the error is bounded by the poll interval times the cache
/// write rate.
pub struct AcquisitionEstimator {
    cache_dir: PathBuf,
    expected_mb: u64,
    start_size: u64,
}

impl AcquisitionEstimator {
    /// `expected_mb == 0` means no expected size is known; raw growth is
    /// reported with an unknown total.
    pub fn new(cache_dir: PathBuf, expected_mb: u64) -> Self {
        let start_size = dir_size(&cache_dir);
        Self {
            cache_dir,
            expected_mb,
            start_size,
        }
    }

    /// Measure the cache once and estimate progress, or `None` while growth
    /// stays below the noise threshold.
    pub fn poll_sample(&self) -> Option<ProgressSample> {
        let current_size = dir_size(&self.cache_dir);
        let delta = current_size.saturating_sub(self.start_size);

        // Threshold in bytes, so reporting starts just past 1 MB of growth
        // rather than after the MB truncation reaches 2.
        if delta <= NOISE_THRESHOLD_BYTES {
            return None;
        }
        let delta_mb = delta / (1024 * 1024);

        if self.expected_mb > 0 {
            let capped = delta_mb.min(self.expected_mb * MAX_ESTIMATED_PERCENT / 100);
            Some(ProgressSample::new(capped, self.expected_mb))
        } else {
            Some(ProgressSample::new(delta_mb, 0))
        }
    }

    /// Run the estimator on an auxiliary thread, reporting through `sink`
    /// until [`RunningEstimator::stop`] is called. The thread never sleeps
    /// longer than one poll interval, so stopping is bounded.
    pub fn spawn(self, sink: Arc<dyn JobSink>) -> RunningEstimator {
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(POLL_INTERVAL) {
                Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    if let Some(sample) = self.poll_sample() {
                        sink.progress(sample);
                    }
                }
            }
        });
        RunningEstimator {
            stop_tx,
            handle: Some(handle),
        }
    }
}

/// Handle to a spawned estimator thread. Estimation stops as soon as the
/// blocking load returns, regardless of outstanding heuristic state.
pub struct RunningEstimator {
    stop_tx: Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl RunningEstimator {
    pub fn stop(mut self) {
        let _ = self.stop_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for RunningEstimator {
    fn drop(&mut self) {
        let _ = self.stop_tx.try_send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Cumulative size of all regular files under `path`, zero if unreadable.
fn dir_size(path: &Path) -> u64 {
    let Ok(entries) = fs::read_dir(path) else {
        return 0;
    };
    let mut size = 0u64;
    for entry in entries.flatten() {
        let entry_path = entry.path();
        if entry_path.is_dir() {
            size += dir_size(&entry_path);
        } else if let Ok(meta) = entry.metadata() {
            size += meta.len();
        }
    }
    size
}
