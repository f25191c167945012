//! Enroll a voice, wait for it to deploy, synthesize with it, save the audio.

use std::path::PathBuf;

use anyhow::anyhow;
use tracing::{error, info};

use crate::error::{CloneError, ProviderError};
use crate::output::write_audio;
use crate::poll::{poll_until, PollError, PollPolicy, PollStep};
use crate::voice::config::DashScopeConfig;
use crate::voice::enrollment::{
    DashScopeEnrollment, Enrollment, VoiceEnrollment, VoiceEnrollmentRequest, VoiceIdentity,
    VoiceInfo,
};
use crate::voice::tts::{
    DashScopeSynthesizer, SpeechSynthesis, SynthesisOptions, SynthesisRequest, SynthesizedAudio,
};

/// Inputs of one clone-and-speak run.
#[derive(Debug, Clone)]
pub struct CloneJob {
    pub enrollment: VoiceEnrollmentRequest,
    pub text: String,
    pub options: SynthesisOptions,
    pub output_path: PathBuf,
    pub poll: PollPolicy,
}

/// How a run that got past enrollment and polling ended.
#[derive(Debug)]
pub enum RunOutcome {
    Saved {
        voice: VoiceIdentity,
        path: PathBuf,
        bytes: usize,
        request_id: Option<String>,
    },
    /// Synthesis failed; nothing was written. Reported, not propagated.
    SynthesisFailed {
        voice: VoiceIdentity,
        error: ProviderError,
    },
}

pub struct VoiceCloner {
    enrollment: Box<dyn VoiceEnrollment>,
    synthesizer: Box<dyn SpeechSynthesis>,
}

impl VoiceCloner {
    pub fn new(
        enrollment: Box<dyn VoiceEnrollment>,
        synthesizer: Box<dyn SpeechSynthesis>,
    ) -> Self {
        Self {
            enrollment,
            synthesizer,
        }
    }

    /// Both clients talk to DashScope with the same credentials.
    pub fn dashscope(config: DashScopeConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(
            Box::new(DashScopeEnrollment::new(config.clone())?),
            Box::new(DashScopeSynthesizer::new(config)),
        ))
    }

    pub async fn enroll(&self, request: &VoiceEnrollmentRequest) -> Result<Enrollment, CloneError> {
        let enrollment = self
            .enrollment
            .create_voice(request)
            .await
            .map_err(CloneError::Enrollment)?;

        info!(
            voice_id = %enrollment.voice,
            request_id = ?enrollment.request_id,
            "Voice enrollment submitted"
        );
        Ok(enrollment)
    }

    /// Poll until the voice is deployed. A failed status aborts at once;
    /// query errors are retried on the next tick.
    pub async fn wait_until_ready(
        &self,
        voice: &VoiceIdentity,
        policy: &PollPolicy,
    ) -> Result<VoiceInfo, CloneError> {
        let max_attempts = policy.max_attempts;

        let result = poll_until(policy, move |attempt| async move {
            let voice_info = self.enrollment.query_voice(voice).await?;
            info!(
                attempt,
                max_attempts,
                status = %voice_info.status,
                "Voice status is '{}'",
                voice_info.status
            );

            Ok::<_, ProviderError>(if voice_info.status.is_ready() {
                PollStep::Ready(voice_info)
            } else if voice_info.status.is_failed() {
                PollStep::Abort(voice_info.status)
            } else {
                PollStep::Pending
            })
        })
        .await;

        match result {
            Ok(voice_info) => {
                info!(voice_id = %voice, "Voice is ready for synthesis");
                Ok(voice_info)
            }
            Err(PollError::Aborted { reason, .. }) => Err(CloneError::VoiceProcessingFailed {
                voice_id: voice.to_string(),
                status: reason.to_string(),
            }),
            Err(PollError::Exhausted {
                attempts,
                last_error,
            }) => Err(CloneError::PollTimeout {
                voice_id: voice.to_string(),
                attempts,
                last_error,
            }),
        }
    }

    pub async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, ProviderError> {
        let audio = self.synthesizer.synthesize(request).await?;
        if audio.data.is_empty() {
            return Err(ProviderError::Malformed(anyhow!(
                "Synthesis for voice {} returned no audio",
                request.voice
            )));
        }
        info!(
            request_id = ?audio.request_id,
            bytes = audio.data.len(),
            "Speech synthesis successful"
        );
        Ok(audio)
    }

    pub async fn run(&self, job: &CloneJob) -> Result<RunOutcome, CloneError> {
        info!(prefix = %job.enrollment.prefix, "Step 1: Creating voice enrollment");
        let enrollment = self.enroll(&job.enrollment).await?;
        let voice = enrollment.voice;

        info!(voice_id = %voice, "Step 2: Polling for voice status");
        self.wait_until_ready(&voice, &job.poll).await?;

        info!(voice_id = %voice, "Step 3: Synthesizing speech with the new voice");
        let request = SynthesisRequest {
            model: job.enrollment.target_model.clone(),
            voice: voice.clone(),
            text: job.text.clone(),
            options: job.options.clone(),
        };

        let audio = match self.synthesize(&request).await {
            Ok(audio) => audio,
            Err(e) => {
                error!(voice_id = %voice, error = %e, "Error during speech synthesis");
                return Ok(RunOutcome::SynthesisFailed { voice, error: e });
            }
        };

        write_audio(&job.output_path, &audio.data).await?;

        Ok(RunOutcome::Saved {
            voice,
            path: job.output_path.clone(),
            bytes: audio.data.len(),
            request_id: audio.request_id,
        })
    }
}
