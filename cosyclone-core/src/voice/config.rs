use std::time::Duration;

use crate::error::CloneError;
use crate::settings::EndpointSettings;

pub const API_KEY_ENV: &str = "DASHSCOPE_API_KEY";
pub const HTTP_BASE_URL_ENV: &str = "DASHSCOPE_HTTP_BASE_URL";
pub const WEBSOCKET_URL_ENV: &str = "DASHSCOPE_WEBSOCKET_BASE_URL";

/// Credentials and endpoints handed to every DashScope client. There is no
/// process-wide key; each client owns a copy of this value.
#[derive(Clone)]
pub struct DashScopeConfig {
    pub api_key: String,
    pub http_base_url: String,
    pub websocket_url: String,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for DashScopeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashScopeConfig")
            .field("api_key", &"<redacted>")
            .field("http_base_url", &self.http_base_url)
            .field("websocket_url", &self.websocket_url)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

impl DashScopeConfig {
    pub fn new(api_key: String, endpoints: &EndpointSettings) -> Self {
        Self {
            api_key,
            http_base_url: endpoints.http_base_url.trim_end_matches('/').to_string(),
            websocket_url: endpoints.websocket_url.clone(),
            request_timeout: Duration::from_secs(endpoints.request_timeout_secs),
        }
    }

    /// Read the API key (and optional endpoint overrides) from the process
    /// environment.
    pub fn from_env(endpoints: &EndpointSettings) -> Result<Self, CloneError> {
        Self::from_lookup(endpoints, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<L>(endpoints: &EndpointSettings, lookup: L) -> Result<Self, CloneError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or(CloneError::MissingApiKey)?;

        let mut endpoints = endpoints.clone();
        if let Some(url) = lookup(HTTP_BASE_URL_ENV).filter(|u| !u.is_empty()) {
            endpoints.http_base_url = url;
        }
        if let Some(url) = lookup(WEBSOCKET_URL_ENV).filter(|u| !u.is_empty()) {
            endpoints.websocket_url = url;
        }

        Ok(Self::new(api_key, &endpoints))
    }
}
