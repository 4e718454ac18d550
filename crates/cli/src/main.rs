use std::path::PathBuf;
use std::process;
use std::sync::{Arc, Mutex};

use clap::Parser;

use srtforge_core::job::config::{JobConfig, DEFAULT_MAX_CHARS};
use srtforge_core::job::coordinator;
use srtforge_core::job::messages::JobStatus;
use srtforge_core::job::sink::JobSink;
use srtforge_core::job::worker;
use srtforge_core::progress::ProgressSample;
use srtforge_core::recognition::domain::model::ModelId;
use srtforge_core::recognition::infrastructure::whisper_engine::WhisperProvider;

/// Transcribe audio and video files to SRT subtitles.
#[derive(Parser)]
#[command(name = "srtforge")]
struct Cli {
    /// Input audio or video files.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Whisper model (tiny, base, small, medium, large-v3, ...).
    #[arg(long, default_value = "medium")]
    model: ModelId,

    /// Maximum characters per subtitle entry.
    #[arg(long, default_value_t = DEFAULT_MAX_CHARS)]
    max_chars: usize,
}

fn main() {
    env_logger::init();

    // Re-invocations of this binary as a job worker divert here.
    if coordinator::worker_requested() {
        process::exit(coordinator::run_worker());
    }

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let inputs = existing_inputs(cli.inputs);
    if inputs.is_empty() {
        return Err("no usable input files".into());
    }

    let config = JobConfig::new(cli.model, cli.max_chars, inputs);
    config.validate()?;

    let sink = Arc::new(ConsoleSink::default());
    let summary = worker::run(&config, &WhisperProvider, sink)?;
    if summary.succeeded == 0 {
        return Err("no files converted".into());
    }
    Ok(())
}

/// Drop inputs that are not existing files, with a warning per skip.
fn existing_inputs(inputs: Vec<PathBuf>) -> Vec<PathBuf> {
    inputs
        .into_iter()
        .filter(|path| {
            if path.is_file() {
                true
            } else {
                log::warn!("Skipping {}: not a file", path.display());
                false
            }
        })
        .collect()
}

/// Renders worker output for a terminal: log and status lines on stderr,
/// progress as a single line rewritten in place.
#[derive(Default)]
struct ConsoleSink {
    line_open: Mutex<bool>,
}

impl ConsoleSink {
    fn finish_progress_line(&self) {
        let mut open = self.line_open.lock().unwrap();
        if *open {
            eprintln!();
            *open = false;
        }
    }
}

impl JobSink for ConsoleSink {
    fn log(&self, line: &str) {
        self.finish_progress_line();
        eprintln!("{line}");
    }

    fn progress(&self, sample: ProgressSample) {
        let mut open = self.line_open.lock().unwrap();
        match sample.percent() {
            Some(pct) => eprint!("\r  {}/{} ({pct}%)", sample.current, sample.total),
            None => eprint!("\r  {}", sample.current),
        }
        *open = true;
    }

    fn status(&self, status: JobStatus) {
        if status == JobStatus::Idle {
            return;
        }
        self.finish_progress_line();
        eprintln!("{status}");
    }
}
