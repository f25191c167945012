pub mod config;
pub mod enrollment;
pub mod mock;
pub mod tts;

pub use config::DashScopeConfig;
pub use enrollment::{DashScopeEnrollment, VoiceEnrollment, VoiceIdentity, VoiceStatus};
pub use tts::{DashScopeSynthesizer, SpeechSynthesis};
