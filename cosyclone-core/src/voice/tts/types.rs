use serde::{Deserialize, Serialize};

use crate::voice::enrollment::VoiceIdentity;

/// Encodings the synthesis service can return.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::VariantArray,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AudioFormat {
    #[default]
    Mp3,
    Wav,
    Pcm,
    Opus,
}

impl AudioFormat {
    pub fn file_extension(&self) -> &'static str {
        match self {
            AudioFormat::Mp3 => "mp3",
            AudioFormat::Wav => "wav",
            AudioFormat::Pcm => "pcm",
            AudioFormat::Opus => "opus",
        }
    }
}

/// Tunables forwarded verbatim to the synthesis service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisOptions {
    pub format: AudioFormat,
    pub sample_rate: u32,
    /// 0-100
    pub volume: u32,
    /// 0.5-2.0
    pub rate: f32,
    /// 0.5-2.0
    pub pitch: f32,
}

impl Default for SynthesisOptions {
    fn default() -> Self {
        Self {
            format: AudioFormat::Mp3,
            sample_rate: 22050,
            volume: 50,
            rate: 1.0,
            pitch: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisRequest {
    pub model: String,
    pub voice: VoiceIdentity,
    pub text: String,
    pub options: SynthesisOptions,
}

/// Encoded audio returned from synthesis
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    pub data: Vec<u8>,
    pub format: AudioFormat,
    pub request_id: Option<String>,
}
