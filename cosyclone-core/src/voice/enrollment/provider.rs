use async_trait::async_trait;

use super::types::{Enrollment, VoiceEnrollmentRequest, VoiceIdentity, VoiceInfo};
use crate::error::ProviderError;

/// Trait for services that turn a reference recording into a reusable voice
#[async_trait]
pub trait VoiceEnrollment: Send + Sync {
    /// Submit an enrollment. Processing continues remotely; poll
    /// [`VoiceEnrollment::query_voice`] until the voice is ready.
    async fn create_voice(
        &self,
        request: &VoiceEnrollmentRequest,
    ) -> Result<Enrollment, ProviderError>;

    /// Fetch the current state of an enrolled voice
    async fn query_voice(&self, voice: &VoiceIdentity) -> Result<VoiceInfo, ProviderError>;
}
