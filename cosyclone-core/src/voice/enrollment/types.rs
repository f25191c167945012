use std::fmt;

use serde::{Deserialize, Serialize};

/// Parameters of a voice enrollment (clone) request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceEnrollmentRequest {
    pub target_model: String,
    /// Provider rules apply (lowercase alphanumeric, under ten characters);
    /// not checked locally.
    pub prefix: String,
    /// Publicly reachable URL of the reference recording.
    pub audio_url: String,
}

/// Opaque id of an enrolled voice. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VoiceIdentity(String);

impl VoiceIdentity {
    pub fn parse(id: impl Into<String>) -> Option<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return None;
        }
        Some(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoiceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for VoiceIdentity {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value).ok_or_else(|| "voice id must not be empty".to_string())
    }
}

impl From<VoiceIdentity> for String {
    fn from(value: VoiceIdentity) -> Self {
        value.0
    }
}

/// Result of a successful create-voice call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrollment {
    pub voice: VoiceIdentity,
    pub request_id: Option<String>,
}

/// Deployment state reported by the provider for an enrolled voice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum VoiceStatus {
    /// Ready for synthesis (`OK`).
    Ok,
    /// Still being processed (`DEPLOYING`).
    Deploying,
    /// Processing failed (`UNDEPLOYED`).
    Undeployed,
    /// Anything else the provider reports; treated as still pending.
    Other(String),
}

impl VoiceStatus {
    pub fn as_str(&self) -> &str {
        match self {
            VoiceStatus::Ok => "OK",
            VoiceStatus::Deploying => "DEPLOYING",
            VoiceStatus::Undeployed => "UNDEPLOYED",
            VoiceStatus::Other(s) => s,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, VoiceStatus::Ok)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, VoiceStatus::Undeployed)
    }
}

impl From<String> for VoiceStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "OK" => VoiceStatus::Ok,
            "DEPLOYING" => VoiceStatus::Deploying,
            "UNDEPLOYED" => VoiceStatus::Undeployed,
            _ => VoiceStatus::Other(value),
        }
    }
}

impl From<&str> for VoiceStatus {
    fn from(value: &str) -> Self {
        VoiceStatus::from(value.to_string())
    }
}

impl From<VoiceStatus> for String {
    fn from(value: VoiceStatus) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for VoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One query-voice response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceInfo {
    pub status: VoiceStatus,
    pub target_model: Option<String>,
    pub gmt_create: Option<String>,
    pub gmt_modified: Option<String>,
    pub request_id: Option<String>,
}

impl VoiceInfo {
    pub fn with_status(status: VoiceStatus) -> Self {
        Self {
            status,
            target_model: None,
            gmt_create: None,
            gmt_modified: None,
            request_id: None,
        }
    }
}
