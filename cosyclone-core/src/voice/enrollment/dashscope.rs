//! DashScope voice enrollment (CosyVoice voice cloning) over HTTP

use anyhow::anyhow;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::VoiceEnrollment;
use super::types::{Enrollment, VoiceEnrollmentRequest, VoiceIdentity, VoiceInfo, VoiceStatus};
use crate::error::ProviderError;
use crate::voice::config::DashScopeConfig;

const ENROLLMENT_MODEL: &str = "voice-enrollment";
const CUSTOMIZATION_PATH: &str = "/services/audio/tts/customization";

pub struct DashScopeEnrollment {
    config: DashScopeConfig,
    client: Client,
}

impl DashScopeEnrollment {
    pub fn new(config: DashScopeConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| ProviderError::Transport(anyhow!("Failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.http_base_url, CUSTOMIZATION_PATH)
    }

    async fn call<T>(&self, input: EnrollmentInput<'_>) -> Result<Envelope<T>, ProviderError>
    where
        T: for<'de> Deserialize<'de>,
    {
        let body = EnrollmentCall {
            model: ENROLLMENT_MODEL,
            input,
        };

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                debug!(?e, "DashScope enrollment call failed");
                ProviderError::Transport(anyhow!("Network error: {e}"))
            })?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(anyhow!("Failed to read response: {e}")))?;

        if !status.is_success() {
            debug!(?status, ?response_text, "DashScope returned error");
            return Err(api_error(status.as_u16(), &response_text));
        }

        serde_json::from_str(&response_text).map_err(|e| {
            ProviderError::Malformed(anyhow!(
                "Failed to parse DashScope response: {e} - Response: {response_text}"
            ))
        })
    }
}

#[derive(Serialize)]
struct EnrollmentCall<'a> {
    model: &'static str,
    input: EnrollmentInput<'a>,
}

#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum EnrollmentInput<'a> {
    CreateVoice {
        target_model: &'a str,
        prefix: &'a str,
        url: &'a str,
    },
    QueryVoice {
        voice_id: &'a str,
    },
}

#[derive(Deserialize)]
struct Envelope<T> {
    output: Option<T>,
    #[serde(default)]
    request_id: Option<String>,
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

#[derive(Deserialize)]
struct CreateVoiceOutput {
    #[serde(default)]
    voice_id: String,
}

#[derive(Deserialize)]
struct QueryVoiceOutput {
    status: String,
    #[serde(default)]
    target_model: Option<String>,
    #[serde(default)]
    gmt_create: Option<String>,
    #[serde(default)]
    gmt_modified: Option<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    request_id: Option<String>,
}

fn api_error(status: u16, body: &str) -> ProviderError {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => ProviderError::Api {
            status: Some(status),
            code: parsed.code.unwrap_or_else(|| "Unknown".to_string()),
            message: parsed.message.unwrap_or_default(),
            request_id: parsed.request_id,
        },
        Err(_) => ProviderError::Api {
            status: Some(status),
            code: "Unknown".to_string(),
            message: body.to_string(),
            request_id: None,
        },
    }
}

impl<T> Envelope<T> {
    /// A 200 response can still carry an error code instead of `output`.
    fn into_output(self) -> Result<(T, Option<String>), ProviderError> {
        match self.output {
            Some(output) => Ok((output, self.request_id)),
            None => match self.code {
                Some(code) => Err(ProviderError::Api {
                    status: None,
                    code,
                    message: self.message.unwrap_or_default(),
                    request_id: self.request_id,
                }),
                None => Err(ProviderError::Malformed(anyhow!(
                    "DashScope response has no output (request id: {:?})",
                    self.request_id
                ))),
            },
        }
    }
}

#[async_trait]
impl VoiceEnrollment for DashScopeEnrollment {
    async fn create_voice(
        &self,
        request: &VoiceEnrollmentRequest,
    ) -> Result<Enrollment, ProviderError> {
        let envelope: Envelope<CreateVoiceOutput> = self
            .call(EnrollmentInput::CreateVoice {
                target_model: &request.target_model,
                prefix: &request.prefix,
                url: &request.audio_url,
            })
            .await?;

        let (output, request_id) = envelope.into_output()?;
        let voice = VoiceIdentity::parse(output.voice_id).ok_or_else(|| {
            ProviderError::Malformed(anyhow!(
                "DashScope returned an empty voice id (request id: {request_id:?})"
            ))
        })?;

        Ok(Enrollment { voice, request_id })
    }

    async fn query_voice(&self, voice: &VoiceIdentity) -> Result<VoiceInfo, ProviderError> {
        let envelope: Envelope<QueryVoiceOutput> = self
            .call(EnrollmentInput::QueryVoice {
                voice_id: voice.as_str(),
            })
            .await?;

        let (output, request_id) = envelope.into_output()?;

        Ok(VoiceInfo {
            status: VoiceStatus::from(output.status),
            target_model: output.target_model,
            gmt_create: output.gmt_create,
            gmt_modified: output.gmt_modified,
            request_id,
        })
    }
}
