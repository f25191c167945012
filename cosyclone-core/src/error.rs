use std::path::PathBuf;

use anyhow::anyhow;
use thiserror::Error;

/// Failure of a single remote call to the voice provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    /// The request never produced a usable response (connect, send, read).
    #[error("Transport error: {0}")]
    Transport(anyhow::Error),

    /// The provider answered and rejected the request.
    #[error("API error {code}: {message} (status: {status:?}, request id: {request_id:?})")]
    Api {
        status: Option<u16>,
        code: String,
        message: String,
        request_id: Option<String>,
    },

    /// The provider answered with something we could not interpret.
    #[error("Malformed response: {0}")]
    Malformed(anyhow::Error),
}

impl From<serde_json::Error> for ProviderError {
    fn from(source: serde_json::Error) -> Self {
        Self::Malformed(anyhow!(source))
    }
}

#[derive(Error, Debug)]
pub enum CloneError {
    #[error("DASHSCOPE_API_KEY environment variable not set")]
    MissingApiKey,

    #[error("Voice enrollment failed: {0}")]
    Enrollment(#[source] ProviderError),

    #[error("Voice {voice_id} processing failed with status '{status}'")]
    VoiceProcessingFailed { voice_id: String, status: String },

    #[error("Voice {voice_id} not ready after {attempts} attempts{}", last_error_suffix(.last_error))]
    PollTimeout {
        voice_id: String,
        attempts: u32,
        last_error: Option<String>,
    },

    #[error("Failed to write audio to {path:?}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn last_error_suffix(last_error: &Option<String>) -> String {
    match last_error {
        Some(e) => format!(" (last error: {e})"),
        None => String::new(),
    }
}
