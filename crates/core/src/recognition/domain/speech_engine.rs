use std::path::Path;

use thiserror::Error;

use crate::recognition::domain::model::ModelId;
use crate::recognition::domain::segment::RecognizedSegment;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("failed to acquire model '{model}': {detail}")]
    Acquisition { model: ModelId, detail: String },
    #[error("failed to load model '{model}': {detail}")]
    Load { model: ModelId, detail: String },
    #[error("failed to read audio {path}: {detail}")]
    Audio { path: String, detail: String },
    #[error("inference failed: {0}")]
    Inference(String),
}

/// Metadata the engine reports alongside the segment stream.
#[derive(Clone, Debug, PartialEq)]
pub struct TranscriptionInfo {
    /// Length of the decoded audio in seconds.
    pub audio_duration: f64,
}

/// The segment stream for one transcription run: finite, consumed once,
/// not restartable. Segments arrive as the engine produces them, so a
/// consumer can report progress while inference is still running. An
/// inference failure mid-run surfaces as a final `Err` item, after which
/// the stream ends.
pub type SegmentStream = Box<dyn Iterator<Item = Result<RecognizedSegment, EngineError>> + Send>;

/// Domain interface for the external speech-recognition engine.
///
/// The engine is a black box: it turns an audio file into timed text
/// segments. How it decodes, detects voice activity, or batches inference
/// is its own concern.
pub trait SpeechEngine: Send {
    fn transcribe(&self, audio: &Path) -> Result<(SegmentStream, TranscriptionInfo), EngineError>;
}

/// Acquires and loads a model into a ready-to-use engine.
///
/// `load` blocks for the whole acquisition (download and/or load into
/// memory) and offers no native progress signal; callers that want progress
/// run the acquisition estimator concurrently.
pub trait EngineProvider: Send {
    fn load(&self, model: ModelId) -> Result<Box<dyn SpeechEngine>, EngineError>;
}
