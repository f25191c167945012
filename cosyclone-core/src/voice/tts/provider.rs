use async_trait::async_trait;

use super::types::{SynthesisRequest, SynthesizedAudio};
use crate::error::ProviderError;

/// Trait for text-to-speech providers
#[async_trait]
pub trait SpeechSynthesis: Send + Sync {
    /// Synthesize text with an enrolled voice
    async fn synthesize(&self, request: &SynthesisRequest)
        -> Result<SynthesizedAudio, ProviderError>;
}
