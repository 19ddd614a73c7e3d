use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command as AsyncCommand;
use tracing::{debug, error, instrument};

use crate::config::{GenerationParams, VertexConfig};

/// A past exchange handed to the model as a few-shot example.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamplePair {
    pub input: String,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatRequest {
    pub context: String,
    pub examples: Vec<ExamplePair>,
    pub message: String,
    pub parameters: GenerationParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelErrorKind {
    /// Missing project id or no way to obtain a token
    Config,
    /// Transport failure
    Network,
    /// 401 / 403
    Auth,
    /// Any other non-success status
    Api,
    /// Body could not be parsed or held no reply
    InvalidResponse,
}

#[derive(Debug, Error)]
#[error("{message}")]
pub struct ModelError {
    pub kind: ModelErrorKind,
    pub message: String,
}

impl ModelError {
    pub fn new(kind: ModelErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// The one call the turn controller makes to a chat model.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ModelError>;

    fn model_id(&self) -> &str;
}

// Structures matching the Vertex AI PaLM chat `:predict` endpoint
#[derive(Serialize)]
struct PredictRequest<'a> {
    instances: [ChatInstance<'a>; 1],
    parameters: &'a GenerationParams,
}

#[derive(Serialize)]
struct ChatInstance<'a> {
    context: &'a str,
    examples: Vec<VertexExample<'a>>,
    messages: [VertexMessage<'a>; 1],
}

#[derive(Serialize)]
struct VertexExample<'a> {
    input: VertexContent<'a>,
    output: VertexContent<'a>,
}

#[derive(Serialize)]
struct VertexContent<'a> {
    content: &'a str,
}

#[derive(Serialize)]
struct VertexMessage<'a> {
    author: &'a str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct PredictResponse {
    #[serde(default)]
    predictions: Vec<Prediction>,
}

#[derive(Deserialize, Debug)]
struct Prediction {
    #[serde(default)]
    candidates: Vec<Candidate>,
    // safetyAttributes, citationMetadata, etc. are ignored
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: String,
}

pub struct VertexChatModel {
    client: Client,
    config: VertexConfig,
    url: String,
}

impl VertexChatModel {
    pub fn new(config: VertexConfig) -> Result<Self, ModelError> {
        let project_id = config.project_id.as_deref().ok_or_else(|| {
            ModelError::new(
                ModelErrorKind::Config,
                "no Vertex AI project id configured (set GOOGLE_CLOUD_PROJECT or --project)",
            )
        })?;

        let url = format!(
            "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:predict",
            config.base_url(),
            project_id,
            config.location,
            config.model
        );

        Ok(Self {
            client: Client::new(),
            config,
            url,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn access_token(&self) -> Result<String, ModelError> {
        if let Some(token) = self.config.access_token.as_deref().filter(|t| !t.trim().is_empty()) {
            return Ok(token.to_string());
        }

        debug!("No access token configured, asking gcloud");
        let output = AsyncCommand::new("gcloud")
            .args(["auth", "print-access-token"])
            .output()
            .await
            .map_err(|e| {
                ModelError::new(
                    ModelErrorKind::Config,
                    format!("failed to run gcloud for an access token: {}", e),
                )
            })?;

        if !output.status.success() {
            return Err(ModelError::new(
                ModelErrorKind::Config,
                format!(
                    "gcloud auth print-access-token failed: {}",
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ));
        }

        token_from_stdout(&output.stdout)
    }
}

fn token_from_stdout(stdout: &[u8]) -> Result<String, ModelError> {
    let token = String::from_utf8_lossy(stdout).trim().to_string();
    if token.is_empty() {
        return Err(ModelError::new(
            ModelErrorKind::Config,
            "gcloud auth print-access-token returned an empty token",
        ));
    }
    Ok(token)
}

fn build_payload(request: &ChatRequest) -> PredictRequest<'_> {
    PredictRequest {
        instances: [ChatInstance {
            context: &request.context,
            examples: request
                .examples
                .iter()
                .map(|pair| VertexExample {
                    input: VertexContent {
                        content: &pair.input,
                    },
                    output: VertexContent {
                        content: &pair.output,
                    },
                })
                .collect(),
            messages: [VertexMessage {
                author: "user",
                content: &request.message,
            }],
        }],
        parameters: &request.parameters,
    }
}

#[async_trait]
impl ChatModel for VertexChatModel {
    #[instrument(skip(self, request), fields(model = %self.config.model, examples = request.examples.len()))]
    async fn send_message(&self, request: &ChatRequest) -> Result<String, ModelError> {
        let token = self.access_token().await?;
        let payload = build_payload(request);

        debug!(url = %self.url, "Sending chat request to Vertex AI");

        let response = self
            .client
            .post(&self.url)
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                ModelError::new(
                    ModelErrorKind::Network,
                    format!("failed to send request to Vertex AI at {}: {}", self.url, e),
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            error!(%status, %error_body, "Vertex AI request failed");
            let kind = match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ModelErrorKind::Auth,
                _ => ModelErrorKind::Api,
            };
            return Err(ModelError::new(
                kind,
                format!("Vertex AI request failed with status {}: {}", status, error_body),
            ));
        }

        let predict = response.json::<PredictResponse>().await.map_err(|e| {
            ModelError::new(
                ModelErrorKind::InvalidResponse,
                format!("failed to parse JSON response from Vertex AI: {}", e),
            )
        })?;

        let reply = predict
            .predictions
            .into_iter()
            .next()
            .and_then(|p| p.candidates.into_iter().next())
            .map(|c| c.content)
            .ok_or_else(|| {
                ModelError::new(ModelErrorKind::InvalidResponse, "no candidates in Vertex AI response")
            })?;

        debug!(?reply, "Received Vertex AI reply");
        Ok(reply)
    }

    fn model_id(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> VertexConfig {
        VertexConfig {
            project_id: Some("my-project".to_string()),
            location: "us-central1".to_string(),
            model: "chat-bison@001".to_string(),
            endpoint: None,
            access_token: Some("token".to_string()),
        }
    }

    #[test]
    fn test_new_requires_project_id() {
        let mut cfg = config();
        cfg.project_id = None;
        let err = VertexChatModel::new(cfg).err().unwrap();
        assert_eq!(err.kind, ModelErrorKind::Config);
    }

    #[test]
    fn test_predict_url() {
        let model = VertexChatModel::new(config()).unwrap();
        assert_eq!(
            model.url(),
            "https://us-central1-aiplatform.googleapis.com/v1/projects/my-project/locations/us-central1/publishers/google/models/chat-bison@001:predict"
        );
        assert_eq!(model.model_id(), "chat-bison@001");
    }

    #[test]
    fn test_token_from_stdout_trims_and_rejects_empty() {
        assert_eq!(token_from_stdout(b"ya29.abc\n").unwrap(), "ya29.abc");

        let err = token_from_stdout(b"  \n").unwrap_err();
        assert_eq!(err.kind, ModelErrorKind::Config);
        assert!(token_from_stdout(b"").is_err());
    }

    #[test]
    fn test_payload_shape() {
        let request = ChatRequest {
            context: "be brief".to_string(),
            examples: vec![ExamplePair {
                input: "hi".to_string(),
                output: "hello".to_string(),
            }],
            message: "how are you?".to_string(),
            parameters: GenerationParams::default(),
        };

        let value = serde_json::to_value(build_payload(&request)).unwrap();
        let instance = &value["instances"][0];
        assert_eq!(instance["context"], "be brief");
        assert_eq!(instance["examples"][0]["input"]["content"], "hi");
        assert_eq!(instance["examples"][0]["output"]["content"], "hello");
        assert_eq!(instance["messages"][0]["author"], "user");
        assert_eq!(instance["messages"][0]["content"], "how are you?");
        assert_eq!(value["parameters"]["maxOutputTokens"], 256);
        assert_eq!(value["parameters"]["topK"], 40);
    }
}
