use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

use crate::constants;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be within [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f32 },
    #[error("{name} must be positive")]
    NotPositive { name: &'static str },
}

/// Sampling parameters sent with every chat request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: constants::DEFAULT_TEMPERATURE,
            max_output_tokens: constants::DEFAULT_MAX_OUTPUT_TOKENS,
            top_p: constants::DEFAULT_TOP_P,
            top_k: constants::DEFAULT_TOP_K,
        }
    }
}

impl GenerationParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [("temperature", self.temperature), ("top_p", self.top_p)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfUnitRange { name, value });
            }
        }
        if self.max_output_tokens == 0 {
            return Err(ConfigError::NotPositive {
                name: "max_output_tokens",
            });
        }
        if self.top_k == 0 {
            return Err(ConfigError::NotPositive { name: "top_k" });
        }
        Ok(())
    }
}

/// Where and as whom the Vertex AI chat model is called.
#[derive(Debug, Clone)]
pub struct VertexConfig {
    pub project_id: Option<String>,
    pub location: String,
    pub model: String,
    /// Base URL; defaults to the regional aiplatform host.
    pub endpoint: Option<String>,
    /// Bearer token. When unset, `gcloud auth print-access-token` is used.
    pub access_token: Option<String>,
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            project_id: constants::PROJECT_ID.clone(),
            location: constants::LOCATION.clone(),
            model: constants::CHAT_MODEL.clone(),
            endpoint: constants::VERTEX_ENDPOINT.clone(),
            access_token: constants::ACCESS_TOKEN.clone(),
        }
    }
}

impl VertexConfig {
    pub fn base_url(&self) -> String {
        match &self.endpoint {
            Some(endpoint) => endpoint.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com", self.location),
        }
    }
}

/// Everything the turn controller needs besides the model itself.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    pub chat_file: PathBuf,
    /// Name the bot posts under. A log whose last message is from this user
    /// needs no reply.
    pub bot_user: String,
    /// Context template; `{{ user }}` expands to `bot_user`.
    pub context: String,
    pub blocklist: Vec<String>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            chat_file: PathBuf::from(constants::CHAT_FILE.as_str()),
            bot_user: constants::BOT_USER.clone(),
            context: constants::DEFAULT_CONTEXT.to_string(),
            blocklist: constants::BAD_RESPONSES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
