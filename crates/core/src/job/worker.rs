use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::job::config::{ConfigError, JobConfig};
use crate::job::messages::JobStatus;
use crate::job::sink::JobSink;
use crate::media::{self, MediaError, MediaKind};
use crate::progress::acquisition::AcquisitionEstimator;
use crate::progress::duration_tracker::DurationTracker;
use crate::recognition::domain::speech_engine::{EngineError, EngineProvider, SpeechEngine};
use crate::recognition::infrastructure::model_resolver;
use crate::subtitle::builder::SubtitleBuilder;
use crate::subtitle::timestamp::TimestampError;

/// Errors that abort the whole job. Per-file problems are [`FileError`]s and
/// never surface here.
#[derive(Error, Debug)]
pub enum WorkerError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// Errors scoped to a single input file. The batch continues past them.
#[derive(Error, Debug)]
pub enum FileError {
    #[error("unsupported file type: {0}")]
    Unsupported(String),
    #[error(transparent)]
    Media(#[from] MediaError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Timestamp(#[from] TimestampError),
    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Outcome of a completed batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct JobSummary {
    pub attempted: usize,
    pub succeeded: usize,
}

/// Run one job end to end: load the model once, then convert each input in
/// order. A failing file is logged and skipped; the terminal status is
/// `Finished` unless the environment or the model itself is unusable.
pub fn run(
    config: &JobConfig,
    provider: &dyn EngineProvider,
    sink: Arc<dyn JobSink>,
) -> Result<JobSummary, WorkerError> {
    match run_inner(config, provider, Arc::clone(&sink)) {
        Ok(summary) => {
            sink.status(JobStatus::Finished);
            Ok(summary)
        }
        Err(err) => {
            sink.status(JobStatus::Error {
                message: err.to_string(),
            });
            Err(err)
        }
    }
}

fn run_inner(
    config: &JobConfig,
    provider: &dyn EngineProvider,
    sink: Arc<dyn JobSink>,
) -> Result<JobSummary, WorkerError> {
    media::sweep_stale_temp();
    config.validate()?;

    if requires_ffmpeg(&config.inputs) {
        media::ensure_ffmpeg()?;
    }

    sink.status(JobStatus::Loading);
    sink.log(&format!("Loading model '{}'...", config.model));

    // Acquisition has no native progress callback; estimate it from cache
    // growth while the load blocks. A cached model produces no growth, so
    // the estimator is only worth spawning for a download.
    let estimator = if model_resolver::is_cached(config.model) {
        sink.log(&format!("Model '{}' found in cache", config.model));
        None
    } else {
        model_resolver::model_cache_dir().ok().map(|cache_dir| {
            AcquisitionEstimator::new(cache_dir, config.model.expected_download_mb())
                .spawn(Arc::clone(&sink))
        })
    };
    let loaded = provider.load(config.model);
    if let Some(estimator) = estimator {
        estimator.stop();
    }
    let engine = loaded?;
    sink.log("Model ready");

    let total = config.inputs.len();
    let mut succeeded = 0usize;

    for (i, input) in config.inputs.iter().enumerate() {
        sink.status(JobStatus::Processing {
            index: i + 1,
            total,
            file: display_name(input),
        });

        match process_file(input, config, engine.as_ref(), sink.as_ref()) {
            Ok(output) => {
                succeeded += 1;
                sink.log(&format!("Wrote {}", output.display()));
            }
            Err(err) => {
                log::warn!("Skipping {}: {err}", input.display());
                sink.log(&format!("Failed on {}: {err}", display_name(input)));
            }
        }
    }

    if total > 1 {
        sink.log(&format!("Done: {succeeded}/{total} files converted"));
    }

    Ok(JobSummary {
        attempted: total,
        succeeded,
    })
}

/// Convert a single input into an `.srt` file beside it.
fn process_file(
    input: &Path,
    config: &JobConfig,
    engine: &dyn SpeechEngine,
    sink: &dyn JobSink,
) -> Result<PathBuf, FileError> {
    let kind = media::classify(input)
        .ok_or_else(|| FileError::Unsupported(display_name(input)))?;

    // Video inputs go through an extraction step; the temp directory lives
    // until the transcription of this file completes.
    let extracted;
    let audio_path: &Path = match kind {
        MediaKind::Audio => input,
        MediaKind::Video => {
            sink.log(&format!("Extracting audio from {}", display_name(input)));
            extracted = media::extract::extract_audio(input)?;
            extracted.path()
        }
    };

    sink.log(&format!("Transcribing {}", display_name(input)));
    let (segments, info) = engine.transcribe(audio_path)?;

    let probed = media::probe::probe_duration(input);
    let total_duration = probed.or(if info.audio_duration > 0.0 {
        Some(info.audio_duration)
    } else {
        None
    });
    let mut tracker = DurationTracker::new(total_duration);

    // The stream yields segments live while inference runs; an engine
    // failure arrives as the final item. Entries built before the failure
    // are discarded with the file.
    let mut stream_failure: Option<EngineError> = None;
    let segments = segments.map_while(|item| match item {
        Ok(segment) => Some(segment),
        Err(err) => {
            stream_failure = Some(err);
            None
        }
    });

    let builder = SubtitleBuilder::new(config.max_chars);
    let document = builder.build(segments, &mut tracker, &mut |sample| {
        sink.progress(sample);
    })?;
    if let Some(err) = stream_failure {
        return Err(err.into());
    }

    if document.is_empty() {
        sink.log(&format!("No speech found in {}", display_name(input)));
    }

    let output = output_path(input, config);
    fs::write(&output, &document.content).map_err(|source| FileError::Write {
        path: output.display().to_string(),
        source,
    })?;

    Ok(output)
}

/// True when any input will have to pass through ffmpeg: video needs
/// extraction, and audio needs conversion unless it is already a mono
/// 16 kHz WAV the engine reads directly. Unsupported files are skipped
/// later and never reach ffmpeg.
fn requires_ffmpeg(inputs: &[PathBuf]) -> bool {
    inputs.iter().any(|input| match media::classify(input) {
        Some(MediaKind::Video) => true,
        Some(MediaKind::Audio) => !media::is_ready_wav(input),
        None => false,
    })
}

/// `<stem>_<model>.srt` in the input's directory.
fn output_path(input: &Path, config: &JobConfig) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    input.with_file_name(format!("{stem}_{}.srt", config.model))
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::sink::test_support::MemorySink;
    use crate::recognition::domain::model::ModelId;
    use crate::recognition::domain::segment::RecognizedSegment;
    use crate::recognition::domain::speech_engine::{SegmentStream, TranscriptionInfo};
    use crate::shared::constants::WHISPER_SAMPLE_RATE;
    use std::fs::File;
    use tempfile::TempDir;

    struct FakeEngine {
        segments: Vec<RecognizedSegment>,
        fail_on: Option<String>,
        fail_mid_stream: bool,
    }

    impl SpeechEngine for FakeEngine {
        fn transcribe(
            &self,
            audio: &Path,
        ) -> Result<(SegmentStream, TranscriptionInfo), EngineError> {
            if let Some(name) = &self.fail_on {
                if audio.to_string_lossy().contains(name.as_str()) {
                    return Err(EngineError::Inference("decoder blew up".to_string()));
                }
            }
            let duration = self.segments.last().map(|s| s.end).unwrap_or(0.0);
            let mut items: Vec<Result<RecognizedSegment, EngineError>> =
                self.segments.clone().into_iter().map(Ok).collect();
            if self.fail_mid_stream {
                items.push(Err(EngineError::Inference(
                    "decoder blew up".to_string(),
                )));
            }
            let stream: SegmentStream = Box::new(items.into_iter());
            Ok((stream, TranscriptionInfo {
                audio_duration: duration,
            }))
        }
    }

    struct FakeProvider {
        segments: Vec<RecognizedSegment>,
        fail_on: Option<String>,
        fail_load: bool,
        fail_mid_stream: bool,
    }

    impl FakeProvider {
        fn speaking(segments: Vec<RecognizedSegment>) -> Self {
            Self {
                segments,
                fail_on: None,
                fail_load: false,
                fail_mid_stream: false,
            }
        }
    }

    impl EngineProvider for FakeProvider {
        fn load(&self, model: ModelId) -> Result<Box<dyn SpeechEngine>, EngineError> {
            if self.fail_load {
                return Err(EngineError::Load {
                    model,
                    detail: "corrupt model file".to_string(),
                });
            }
            Ok(Box::new(FakeEngine {
                segments: self.segments.clone(),
                fail_on: self.fail_on.clone(),
                fail_mid_stream: self.fail_mid_stream,
            }))
        }
    }

    fn seg(start: f64, end: f64, text: &str) -> RecognizedSegment {
        RecognizedSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        File::create(&path).unwrap();
        path
    }

    fn wav_with(dir: &TempDir, name: &str, channels: u16, sample_rate: u32) -> PathBuf {
        let path = dir.path().join(name);
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(&path, spec).unwrap();
        for _ in 0..16 {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
        path
    }

    fn wav(dir: &TempDir, name: &str) -> PathBuf {
        wav_with(dir, name, 1, WHISPER_SAMPLE_RATE)
    }

    #[test]
    fn test_run_writes_srt_beside_input() {
        let dir = TempDir::new().unwrap();
        let input = wav(&dir, "clip.wav");
        let provider = FakeProvider::speaking(vec![seg(0.0, 2.0, "Hello world")]);
        let sink = Arc::new(MemorySink::default());
        let config = JobConfig::new(ModelId::Medium, 40, vec![input]);

        let summary = run(&config, &provider, sink.clone()).unwrap();

        assert_eq!(summary, JobSummary {
            attempted: 1,
            succeeded: 1,
        });
        let output = dir.path().join("clip_medium.srt");
        let content = fs::read_to_string(output).unwrap();
        assert_eq!(content, "1\n00:00:00,000 --> 00:00:02,000\nHello world\n");
    }

    #[test]
    fn test_run_status_sequence_ends_finished() {
        let dir = TempDir::new().unwrap();
        let input = wav(&dir, "clip.wav");
        let provider = FakeProvider::speaking(vec![seg(0.0, 1.0, "hi")]);
        let sink = Arc::new(MemorySink::default());
        let config = JobConfig::new(ModelId::Tiny, 40, vec![input]);

        run(&config, &provider, sink.clone()).unwrap();

        let statuses = sink.statuses();
        assert_eq!(statuses[0], JobStatus::Loading);
        assert!(matches!(
            statuses[1],
            JobStatus::Processing { index: 1, total: 1, .. }
        ));
        assert_eq!(*statuses.last().unwrap(), JobStatus::Finished);
    }

    #[test]
    fn test_failing_file_does_not_abort_batch() {
        let dir = TempDir::new().unwrap();
        let bad = wav(&dir, "broken.wav");
        let good = wav(&dir, "fine.wav");
        let provider = FakeProvider {
            segments: vec![seg(0.0, 1.5, "still here")],
            fail_on: Some("broken".to_string()),
            fail_load: false,
            fail_mid_stream: false,
        };
        let sink = Arc::new(MemorySink::default());
        let config = JobConfig::new(ModelId::Small, 40, vec![bad, good.clone()]);

        let summary = run(&config, &provider, sink.clone()).unwrap();

        assert_eq!(summary, JobSummary {
            attempted: 2,
            succeeded: 1,
        });
        assert!(dir.path().join("fine_small.srt").exists());
        assert!(!dir.path().join("broken_small.srt").exists());
        assert!(sink
            .logs()
            .iter()
            .any(|l| l.contains("Done: 1/2 files converted")));
        assert_eq!(*sink.statuses().last().unwrap(), JobStatus::Finished);
    }

    #[test]
    fn test_unsupported_extension_is_skipped() {
        let dir = TempDir::new().unwrap();
        let doc = touch(&dir, "notes.txt");
        let clip = wav(&dir, "clip.wav");
        let provider = FakeProvider::speaking(vec![seg(0.0, 1.0, "ok")]);
        let sink = Arc::new(MemorySink::default());
        let config = JobConfig::new(ModelId::Base, 40, vec![doc, clip]);

        let summary = run(&config, &provider, sink.clone()).unwrap();

        assert_eq!(summary.succeeded, 1);
        assert!(sink
            .logs()
            .iter()
            .any(|l| l.contains("unsupported file type")));
    }

    #[test]
    fn test_no_summary_line_for_single_input() {
        let dir = TempDir::new().unwrap();
        let input = wav(&dir, "clip.wav");
        let provider = FakeProvider::speaking(vec![seg(0.0, 1.0, "ok")]);
        let sink = Arc::new(MemorySink::default());
        let config = JobConfig::new(ModelId::Medium, 40, vec![input]);

        run(&config, &provider, sink.clone()).unwrap();

        assert!(!sink.logs().iter().any(|l| l.starts_with("Done:")));
    }

    #[test]
    fn test_invalid_config_reports_error_status() {
        let provider = FakeProvider::speaking(vec![]);
        let sink = Arc::new(MemorySink::default());
        let config = JobConfig::new(ModelId::Medium, 2, vec![PathBuf::from("clip.wav")]);

        let result = run(&config, &provider, sink.clone());

        assert!(matches!(result, Err(WorkerError::Config(_))));
        assert!(matches!(
            sink.statuses().last(),
            Some(JobStatus::Error { .. })
        ));
    }

    #[test]
    fn test_model_load_failure_is_fatal() {
        let dir = TempDir::new().unwrap();
        let input = wav(&dir, "clip.wav");
        let provider = FakeProvider {
            segments: vec![],
            fail_on: None,
            fail_load: true,
            fail_mid_stream: false,
        };
        let sink = Arc::new(MemorySink::default());
        let config = JobConfig::new(ModelId::LargeV3, 40, vec![input]);

        let result = run(&config, &provider, sink.clone());

        assert!(matches!(result, Err(WorkerError::Engine(_))));
        let last = sink.statuses().last().cloned().unwrap();
        assert!(last.is_terminal());
        assert!(matches!(last, JobStatus::Error { .. }));
    }

    #[test]
    fn test_silent_input_still_writes_empty_file() {
        let dir = TempDir::new().unwrap();
        let input = wav(&dir, "silence.wav");
        let provider = FakeProvider::speaking(vec![seg(0.0, 3.0, "   ")]);
        let sink = Arc::new(MemorySink::default());
        let config = JobConfig::new(ModelId::Medium, 40, vec![input]);

        let summary = run(&config, &provider, sink.clone()).unwrap();

        assert_eq!(summary.succeeded, 1);
        let output = dir.path().join("silence_medium.srt");
        assert_eq!(fs::read_to_string(output).unwrap(), "");
    }

    #[test]
    fn test_ffmpeg_required_for_compressed_audio() {
        let dir = TempDir::new().unwrap();
        let song = touch(&dir, "song.mp3");
        assert!(requires_ffmpeg(&[song]));
    }

    #[test]
    fn test_ffmpeg_required_for_video() {
        let dir = TempDir::new().unwrap();
        let show = touch(&dir, "show.mkv");
        assert!(requires_ffmpeg(&[show]));
    }

    #[test]
    fn test_ffmpeg_required_for_wav_needing_resample() {
        let dir = TempDir::new().unwrap();
        let cd = wav_with(&dir, "cd.wav", 2, 44100);
        assert!(requires_ffmpeg(&[cd]));
    }

    #[test]
    fn test_ffmpeg_not_required_for_ready_wav_batch() {
        let dir = TempDir::new().unwrap();
        let a = wav(&dir, "a.wav");
        let b = wav(&dir, "b.wav");
        let notes = touch(&dir, "notes.txt");
        assert!(!requires_ffmpeg(&[a, b, notes]));
    }

    #[test]
    fn test_mid_stream_engine_failure_fails_the_file() {
        let dir = TempDir::new().unwrap();
        let input = wav(&dir, "clip.wav");
        let provider = FakeProvider {
            segments: vec![seg(0.0, 2.5, "early words")],
            fail_on: None,
            fail_load: false,
            fail_mid_stream: true,
        };
        let sink = Arc::new(MemorySink::default());
        let config = JobConfig::new(ModelId::Medium, 40, vec![input]);

        let summary = run(&config, &provider, sink.clone()).unwrap();

        assert_eq!(summary, JobSummary {
            attempted: 1,
            succeeded: 0,
        });
        assert!(!dir.path().join("clip_medium.srt").exists());
        assert!(sink.logs().iter().any(|l| l.contains("Failed on clip.wav")));
        assert_eq!(*sink.statuses().last().unwrap(), JobStatus::Finished);
    }

    #[test]
    fn test_output_path_uses_model_suffix() {
        let config = JobConfig::new(ModelId::LargeV3Turbo, 40, vec![]);
        let out = output_path(Path::new("/media/show.mkv"), &config);
        assert_eq!(out, PathBuf::from("/media/show_large-v3-turbo.srt"));
    }
}
