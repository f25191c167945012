use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use async_trait::async_trait;

use crate::error::ProviderError;
use crate::voice::enrollment::{
    Enrollment, VoiceEnrollment, VoiceEnrollmentRequest, VoiceIdentity, VoiceInfo, VoiceStatus,
};
use crate::voice::tts::{SpeechSynthesis, SynthesisRequest, SynthesizedAudio};

/// How the mock answers create-voice
#[derive(Debug, Clone)]
pub enum MockEnrollment {
    /// Return this voice id
    Succeed { voice_id: String },
    /// Return an API error
    Reject { code: String, message: String },
    /// Return a transport error
    TransportError,
}

/// One scripted query-voice answer
#[derive(Debug, Clone)]
pub enum MockPoll {
    Status(VoiceStatus),
    TransportError,
}

/// How the mock answers synthesize
#[derive(Debug, Clone)]
pub enum MockSynthesis {
    Audio(Vec<u8>),
    TransportError,
}

#[derive(Debug, Default)]
struct MockState {
    polls: VecDeque<MockPoll>,
    create_requests: Vec<VoiceEnrollmentRequest>,
    queried: Vec<VoiceIdentity>,
    synthesis_requests: Vec<SynthesisRequest>,
}

/// Mock voice service for testing. Clones share state, so a test can keep
/// one handle for assertions and hand another to the pipeline.
#[derive(Clone)]
pub struct MockVoiceService {
    enrollment: MockEnrollment,
    synthesis: MockSynthesis,
    /// Answer once the poll script is exhausted
    fallback_poll: MockPoll,
    state: Arc<Mutex<MockState>>,
}

impl MockVoiceService {
    pub fn new(enrollment: MockEnrollment, polls: Vec<MockPoll>, synthesis: MockSynthesis) -> Self {
        Self {
            enrollment,
            synthesis,
            fallback_poll: MockPoll::Status(VoiceStatus::Deploying),
            state: Arc::new(Mutex::new(MockState {
                polls: polls.into(),
                ..MockState::default()
            })),
        }
    }

    /// Enrollment succeeds with `voice_id`, polls follow `statuses`, synthesis
    /// returns a few bytes.
    pub fn with_statuses(voice_id: &str, statuses: &[&str]) -> Self {
        Self::new(
            MockEnrollment::Succeed {
                voice_id: voice_id.to_string(),
            },
            statuses
                .iter()
                .map(|s| MockPoll::Status(VoiceStatus::from(*s)))
                .collect(),
            MockSynthesis::Audio(b"ID3mock-audio".to_vec()),
        )
    }

    pub fn set_synthesis(&mut self, synthesis: MockSynthesis) {
        self.synthesis = synthesis;
    }

    pub fn set_fallback_poll(&mut self, poll: MockPoll) {
        self.fallback_poll = poll;
    }

    pub fn create_count(&self) -> usize {
        self.state.lock().unwrap().create_requests.len()
    }

    pub fn query_count(&self) -> usize {
        self.state.lock().unwrap().queried.len()
    }

    pub fn synthesis_count(&self) -> usize {
        self.state.lock().unwrap().synthesis_requests.len()
    }

    pub fn get_create_requests(&self) -> Vec<VoiceEnrollmentRequest> {
        self.state.lock().unwrap().create_requests.clone()
    }

    pub fn get_queried_voices(&self) -> Vec<VoiceIdentity> {
        self.state.lock().unwrap().queried.clone()
    }

    pub fn get_synthesis_requests(&self) -> Vec<SynthesisRequest> {
        self.state.lock().unwrap().synthesis_requests.clone()
    }
}

fn transport_error(what: &str) -> ProviderError {
    ProviderError::Transport(anyhow!("mock {what}: connection reset"))
}

#[async_trait]
impl VoiceEnrollment for MockVoiceService {
    async fn create_voice(
        &self,
        request: &VoiceEnrollmentRequest,
    ) -> Result<Enrollment, ProviderError> {
        self.state
            .lock()
            .unwrap()
            .create_requests
            .push(request.clone());

        match &self.enrollment {
            MockEnrollment::Succeed { voice_id } => {
                let voice = VoiceIdentity::parse(voice_id.clone())
                    .ok_or_else(|| ProviderError::Malformed(anyhow!("empty voice id")))?;
                Ok(Enrollment {
                    voice,
                    request_id: Some("mock-create".to_string()),
                })
            }
            MockEnrollment::Reject { code, message } => Err(ProviderError::Api {
                status: Some(400),
                code: code.clone(),
                message: message.clone(),
                request_id: Some("mock-create".to_string()),
            }),
            MockEnrollment::TransportError => Err(transport_error("create_voice")),
        }
    }

    async fn query_voice(&self, voice: &VoiceIdentity) -> Result<VoiceInfo, ProviderError> {
        let next = {
            let mut state = self.state.lock().unwrap();
            state.queried.push(voice.clone());
            state
                .polls
                .pop_front()
                .unwrap_or_else(|| self.fallback_poll.clone())
        };

        match next {
            MockPoll::Status(status) => Ok(VoiceInfo::with_status(status)),
            MockPoll::TransportError => Err(transport_error("query_voice")),
        }
    }
}

#[async_trait]
impl SpeechSynthesis for MockVoiceService {
    async fn synthesize(
        &self,
        request: &SynthesisRequest,
    ) -> Result<SynthesizedAudio, ProviderError> {
        self.state
            .lock()
            .unwrap()
            .synthesis_requests
            .push(request.clone());

        match &self.synthesis {
            MockSynthesis::Audio(data) => Ok(SynthesizedAudio {
                data: data.clone(),
                format: request.options.format,
                request_id: Some("mock-synthesis".to_string()),
            }),
            MockSynthesis::TransportError => Err(transport_error("synthesize")),
        }
    }
}
