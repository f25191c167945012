pub mod dashscope;
pub mod provider;
pub mod types;

pub use dashscope::DashScopeSynthesizer;
pub use provider::SpeechSynthesis;
pub use types::{AudioFormat, SynthesisOptions, SynthesisRequest, SynthesizedAudio};
