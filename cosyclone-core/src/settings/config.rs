use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::pipeline::CloneJob;
use crate::poll::PollPolicy;
use crate::voice::enrollment::VoiceEnrollmentRequest;
use crate::voice::tts::{AudioFormat, SynthesisOptions};

pub const DEFAULT_TARGET_MODEL: &str = "cosyvoice-v3-plus";
pub const DEFAULT_PREFIX: &str = "myvoice";
pub const DEFAULT_AUDIO_URL: &str =
    "https://dashscope.oss-cn-beijing.aliyuncs.com/samples/audio/cosyvoice/cosyvoice-zeroshot-sample.wav";
pub const DEFAULT_TEXT: &str = "恭喜，已成功复刻并合成了属于自己的声音！";
pub const DEFAULT_OUTPUT_PATH: &str = "my_custom_voice_output.mp3";
pub const DEFAULT_HTTP_BASE_URL: &str = "https://dashscope.aliyuncs.com/api/v1";
pub const DEFAULT_WEBSOCKET_URL: &str = "wss://dashscope.aliyuncs.com/api-ws/v1/inference";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnrollmentSettings {
    pub target_model: String,
    pub prefix: String,
    pub audio_url: String,
}

impl Default for EnrollmentSettings {
    fn default() -> Self {
        Self {
            target_model: DEFAULT_TARGET_MODEL.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            audio_url: DEFAULT_AUDIO_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    pub text: String,
    pub output_path: PathBuf,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub volume: u32,
    pub rate: f32,
    pub pitch: f32,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        let options = SynthesisOptions::default();
        Self {
            text: DEFAULT_TEXT.to_string(),
            output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
            format: options.format,
            sample_rate: options.sample_rate,
            volume: options.volume,
            rate: options.rate,
            pitch: options.pitch,
        }
    }
}

impl SynthesisSettings {
    pub fn options(&self) -> SynthesisOptions {
        SynthesisOptions {
            format: self.format,
            sample_rate: self.sample_rate,
            volume: self.volume,
            rate: self.rate,
            pitch: self.pitch,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollSettings {
    pub max_attempts: u32,
    pub interval_secs: u64,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            max_attempts: 30,
            interval_secs: 10,
        }
    }
}

impl PollSettings {
    pub fn policy(&self) -> PollPolicy {
        PollPolicy::new(self.max_attempts, Duration::from_secs(self.interval_secs))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointSettings {
    pub http_base_url: String,
    pub websocket_url: String,
    pub request_timeout_secs: u64,
}

impl Default for EndpointSettings {
    fn default() -> Self {
        Self {
            http_base_url: DEFAULT_HTTP_BASE_URL.to_string(),
            websocket_url: DEFAULT_WEBSOCKET_URL.to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Everything a run needs apart from the API key. Every field has a
/// default, so an empty file (or no file) is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub enrollment: EnrollmentSettings,
    pub synthesis: SynthesisSettings,
    pub poll: PollSettings,
    pub endpoints: EndpointSettings,
}

impl Settings {
    /// Parse settings from a TOML file. The file must exist.
    pub fn from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {path:?}"))?;
        toml::from_str(&contents).with_context(|| format!("Failed to parse settings in {path:?}"))
    }

    /// Load from `explicit` when given, otherwise from the default location
    /// if a file exists there, otherwise fall back to defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_path(path);
        }

        match Self::default_settings_path() {
            Some(path) if path.exists() => Self::from_path(&path),
            _ => Ok(Self::default()),
        }
    }

    /// ~/.cosyclone/settings.toml
    pub fn default_settings_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".cosyclone").join("settings.toml"))
    }

    pub fn to_job(&self) -> CloneJob {
        CloneJob {
            enrollment: VoiceEnrollmentRequest {
                target_model: self.enrollment.target_model.clone(),
                prefix: self.enrollment.prefix.clone(),
                audio_url: self.enrollment.audio_url.clone(),
            },
            text: self.synthesis.text.clone(),
            options: self.synthesis.options(),
            output_path: self.synthesis.output_path.clone(),
            poll: self.poll.policy(),
        }
    }
}
