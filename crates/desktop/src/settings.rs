use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use srtforge_core::job::config::DEFAULT_MAX_CHARS;
use srtforge_core::recognition::domain::model::ModelId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub model: ModelId,
    pub max_chars: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            model: ModelId::Medium,
            max_chars: DEFAULT_MAX_CHARS as u32,
        }
    }
}

impl Settings {
    fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("SrtForge").join("settings.json"))
    }

    pub fn load() -> Self {
        Self::config_path()
            .and_then(|path| fs::read_to_string(path).ok())
            .and_then(|json| serde_json::from_str(&json).ok())
            .unwrap_or_default()
    }

    pub fn save(&self) {
        if let Some(path) = Self::config_path() {
            if let Some(parent) = path.parent() {
                let _ = fs::create_dir_all(parent);
            }
            if let Ok(json) = serde_json::to_string_pretty(self) {
                let _ = fs::write(path, json);
            }
        }
    }
}
