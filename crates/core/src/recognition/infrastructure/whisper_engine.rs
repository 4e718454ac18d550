use std::path::Path;
use std::thread;

use crossbeam_channel::unbounded;
use whisper_rs::{
    FullParams, SamplingStrategy, SegmentCallbackData, WhisperContext, WhisperContextParameters,
};

use crate::media;
use crate::recognition::domain::model::ModelId;
use crate::recognition::domain::segment::RecognizedSegment;
use crate::recognition::domain::speech_engine::{
    EngineError, EngineProvider, SegmentStream, SpeechEngine, TranscriptionInfo,
};
use crate::recognition::infrastructure::model_resolver;
use crate::shared::constants::WHISPER_SAMPLE_RATE;

/// Loads whisper.cpp models into ready engines.
///
/// `load` resolves the ggml model file (cache hit or blocking download) and
/// builds the whisper context. It reports no progress of its own; the
/// acquisition estimator watches the cache directory from outside.
pub struct WhisperProvider;

impl EngineProvider for WhisperProvider {
    fn load(&self, model: ModelId) -> Result<Box<dyn SpeechEngine>, EngineError> {
        let model_path = model_resolver::resolve(model).map_err(|e| EngineError::Acquisition {
            model,
            detail: e.to_string(),
        })?;

        let path_str = model_path.to_str().ok_or_else(|| EngineError::Load {
            model,
            detail: "model path is not valid UTF-8".to_string(),
        })?;
        let ctx = WhisperContext::new_with_params(path_str, WhisperContextParameters::default())
            .map_err(|e| EngineError::Load {
                model,
                detail: e.to_string(),
            })?;

        Ok(Box::new(WhisperEngine { ctx }))
    }
}

/// Speech recognizer using whisper.cpp via whisper-rs.
pub struct WhisperEngine {
    ctx: WhisperContext,
}

impl SpeechEngine for WhisperEngine {
    /// Inference runs on its own thread; whisper's segment callback feeds
    /// each finished segment through a channel the moment it exists, so the
    /// returned stream yields live while `full` is still decoding. The
    /// inference thread is not joined: whisper cannot be interrupted, and a
    /// consumer that stops reading just lets the remaining sends fail.
    fn transcribe(&self, audio: &Path) -> Result<(SegmentStream, TranscriptionInfo), EngineError> {
        let samples = load_samples(audio)?;
        let audio_duration = samples.len() as f64 / WHISPER_SAMPLE_RATE as f64;

        let mut state = self
            .ctx
            .create_state()
            .map_err(|e| EngineError::Inference(format!("failed to create state: {e}")))?;

        let (tx, rx) = unbounded::<Result<RecognizedSegment, EngineError>>();
        let seg_tx = tx.clone();
        thread::spawn(move || {
            let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 0 });
            params.set_language(Some("auto"));
            params.set_translate(false);
            params.set_print_special(false);
            params.set_print_progress(false);
            params.set_print_realtime(false);
            params.set_print_timestamps(false);
            params.set_n_threads(num_cpus().min(4) as i32);
            params.set_segment_callback_safe(move |data: SegmentCallbackData| {
                // Callback timestamps are in centiseconds.
                let _ = seg_tx.send(Ok(RecognizedSegment {
                    start: data.start_timestamp as f64 / 100.0,
                    end: data.end_timestamp as f64 / 100.0,
                    text: data.text,
                }));
            });

            if let Err(e) = state.full(params, &samples) {
                let _ = tx.send(Err(EngineError::Inference(e.to_string())));
            }
        });

        let stream: SegmentStream = Box::new(rx.into_iter());
        Ok((stream, TranscriptionInfo { audio_duration }))
    }
}

/// Decode `audio` into mono 16 kHz f32 samples.
///
/// WAV files already in the target format are read directly with hound;
/// everything else is normalized through the external ffmpeg extraction
/// step first, since whisper.cpp only consumes raw PCM.
fn load_samples(audio: &Path) -> Result<Vec<f32>, EngineError> {
    if media::is_ready_wav(audio) {
        let reader = hound::WavReader::open(audio).map_err(|e| EngineError::Audio {
            path: audio.display().to_string(),
            detail: e.to_string(),
        })?;
        return read_wav(reader, audio);
    }

    let extracted = media::extract::extract_audio(audio).map_err(|e| EngineError::Audio {
        path: audio.display().to_string(),
        detail: e.to_string(),
    })?;
    let reader = hound::WavReader::open(extracted.path()).map_err(|e| EngineError::Audio {
        path: audio.display().to_string(),
        detail: e.to_string(),
    })?;
    read_wav(reader, audio)
}

fn read_wav<R: std::io::Read>(
    reader: hound::WavReader<R>,
    origin: &Path,
) -> Result<Vec<f32>, EngineError> {
    let spec = reader.spec();
    let samples: Result<Vec<f32>, hound::Error> = match spec.sample_format {
        hound::SampleFormat::Int => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32))
            .collect(),
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
    };
    samples.map_err(|e| EngineError::Audio {
        path: origin.display().to_string(),
        detail: e.to_string(),
    })
}

fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
