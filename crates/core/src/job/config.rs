use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recognition::domain::model::ModelId;

pub const MIN_MAX_CHARS: usize = 4;
pub const DEFAULT_MAX_CHARS: usize = 40;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("max-chars must be at least {MIN_MAX_CHARS}, got {0}")]
    MaxCharsTooSmall(usize),
    #[error("no input files")]
    NoInputs,
}

/// Everything a worker needs for one job. Immutable once submitted; crosses
/// the process boundary as JSON on the worker's stdin.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct JobConfig {
    pub model: ModelId,
    pub max_chars: usize,
    pub inputs: Vec<PathBuf>,
}

impl JobConfig {
    pub fn new(model: ModelId, max_chars: usize, inputs: Vec<PathBuf>) -> Self {
        Self {
            model,
            max_chars,
            inputs,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_chars < MIN_MAX_CHARS {
            return Err(ConfigError::MaxCharsTooSmall(self.max_chars));
        }
        if self.inputs.is_empty() {
            return Err(ConfigError::NoInputs);
        }
        Ok(())
    }
}
