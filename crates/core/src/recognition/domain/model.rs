use serde::{Deserialize, Serialize};

use crate::shared::constants::MODEL_BASE_URL;

/// The closed set of supported Whisper model names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModelId {
    #[serde(rename = "tiny")]
    Tiny,
    #[serde(rename = "tiny.en")]
    TinyEn,
    #[serde(rename = "base")]
    Base,
    #[serde(rename = "base.en")]
    BaseEn,
    #[serde(rename = "small")]
    Small,
    #[serde(rename = "small.en")]
    SmallEn,
    #[serde(rename = "medium")]
    Medium,
    #[serde(rename = "medium.en")]
    MediumEn,
    #[serde(rename = "large-v1")]
    LargeV1,
    #[serde(rename = "large-v2")]
    LargeV2,
    #[serde(rename = "large-v3")]
    LargeV3,
    #[serde(rename = "large-v3-turbo")]
    LargeV3Turbo,
}

impl ModelId {
    pub const ALL: &[ModelId] = &[
        ModelId::Tiny,
        ModelId::TinyEn,
        ModelId::Base,
        ModelId::BaseEn,
        ModelId::Small,
        ModelId::SmallEn,
        ModelId::Medium,
        ModelId::MediumEn,
        ModelId::LargeV1,
        ModelId::LargeV2,
        ModelId::LargeV3,
        ModelId::LargeV3Turbo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Tiny => "tiny",
            ModelId::TinyEn => "tiny.en",
            ModelId::Base => "base",
            ModelId::BaseEn => "base.en",
            ModelId::Small => "small",
            ModelId::SmallEn => "small.en",
            ModelId::Medium => "medium",
            ModelId::MediumEn => "medium.en",
            ModelId::LargeV1 => "large-v1",
            ModelId::LargeV2 => "large-v2",
            ModelId::LargeV3 => "large-v3",
            ModelId::LargeV3Turbo => "large-v3-turbo",
        }
    }

    /// Expected download size in MB, used by the acquisition progress
    /// estimator. These are catalog estimates, not exact file sizes.
    pub fn expected_download_mb(&self) -> u64 {
        match self {
            ModelId::Tiny | ModelId::TinyEn => 75,
            ModelId::Base | ModelId::BaseEn => 145,
            ModelId::Small | ModelId::SmallEn => 490,
            ModelId::Medium | ModelId::MediumEn => 1500,
            ModelId::LargeV1 | ModelId::LargeV2 | ModelId::LargeV3 => 3100,
            ModelId::LargeV3Turbo => 1600,
        }
    }

    pub fn file_name(&self) -> String {
        format!("ggml-{}.bin", self.as_str())
    }

    pub fn url(&self) -> String {
        format!("{MODEL_BASE_URL}/{}", self.file_name())
    }
}

impl std::fmt::Display for ModelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ModelId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ModelId::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ModelId::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown model '{s}', expected one of: {}", names.join(", "))
            })
    }
}
