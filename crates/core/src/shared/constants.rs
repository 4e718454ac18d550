pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "m4a", "flac", "ogg", "aac", "wma"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mkv", "avi", "mov", "webm", "flv"];

/// Whisper consumes mono PCM at this rate.
pub const WHISPER_SAMPLE_RATE: u32 = 16000;

pub const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// Prefix for extracted-audio temp directories, so stale ones left behind
/// by a killed worker can be recognized and swept on the next start.
pub const TEMP_DIR_PREFIX: &str = "srtforge-";
