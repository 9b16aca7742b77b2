//! Gemini `generateContent` client.

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, error};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ModelClient, ModelRequest};
use crate::{
    error::{BuildError, ModelCallKind, Result},
    models::{Message, Role},
};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_MODEL: &str = "gemini-1.5-pro";

/// Connection settings for [`GeminiClient`].
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub timeout: Duration,
}

impl GeminiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(120),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: Vec<PartRef<'a>>,
}

#[derive(Debug, Serialize)]
struct PartRef<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

/// Client for Google's generative-language API.
pub struct GeminiClient {
    config: GeminiConfig,
    http: Client,
}

impl GeminiClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns `BuildError::Configuration` if the API key is empty or the
    /// HTTP client cannot be built.
    pub fn new(config: GeminiConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(BuildError::Configuration {
                message: "Gemini API key is empty".to_string(),
            });
        }
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BuildError::Configuration {
                message: format!("Failed to create HTTP client: {e}"),
            })?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &GeminiConfig {
        &self.config
    }
}

fn wire_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn to_content(message: &Message) -> Content<'_> {
    Content {
        role: wire_role(message.role),
        parts: message
            .parts
            .iter()
            .map(|p| PartRef { text: &p.text })
            .collect(),
    }
}

fn classify(error: &reqwest::Error) -> ModelCallKind {
    if error.is_timeout() {
        ModelCallKind::Timeout
    } else if error.is_decode() {
        ModelCallKind::MalformedPayload
    } else {
        ModelCallKind::Network
    }
}

/// Pulls `error.message` out of an error body when there is one.
fn upstream_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            json.get("error")?
                .get("message")?
                .as_str()
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("HTTP {status}: {body}"))
}

fn first_text(response: GenerateResponse) -> Option<String> {
    response
        .candidates
        .into_iter()
        .next()?
        .content?
        .parts
        .into_iter()
        .find_map(|p| p.text)
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, request: ModelRequest) -> Result<String> {
        let body = GenerateRequest {
            contents: request.messages.iter().map(to_content).collect(),
            system_instruction: request.system.as_deref().map(|text| Content {
                role: "system",
                parts: vec![PartRef { text }],
            }),
        };

        debug!(
            "Calling {} with {} message(s)",
            self.config.model,
            body.contents.len()
        );

        let response = self
            .http
            .post(self.config.endpoint())
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(|e| BuildError::model_call(classify(&e)).with_message(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = upstream_message(status, &text);
            error!("Gemini returned {status}: {message}");
            let kind = if status == StatusCode::TOO_MANY_REQUESTS {
                ModelCallKind::Quota
            } else {
                ModelCallKind::Upstream
            };
            return Err(BuildError::model_call(kind).with_message(message));
        }

        let parsed: GenerateResponse = response.json().await.map_err(|e| {
            BuildError::model_call(ModelCallKind::MalformedPayload).with_message(e.to_string())
        })?;

        first_text(parsed).ok_or_else(|| {
            BuildError::model_call(ModelCallKind::MalformedPayload)
                .with_message("response has no candidate text")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let messages = vec![Message::user("build it"), Message::assistant("<artifact/>")];
        let body = GenerateRequest {
            contents: messages.iter().map(to_content).collect(),
            system_instruction: Some(Content {
                role: "system",
                parts: vec![PartRef { text: "be brief" }],
            }),
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["contents"][0]["role"], "user");
        assert_eq!(json["contents"][1]["role"], "model");
        assert_eq!(json["contents"][1]["parts"][0]["text"], "<artifact/>");
        assert_eq!(json["system_instruction"]["parts"][0]["text"], "be brief");
    }

    #[test]
    fn test_first_text_extraction() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"parts":[{"text":"react"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(first_text(response).as_deref(), Some("react"));

        let empty: GenerateResponse = serde_json::from_str(r#"{"candidates":[]}"#).unwrap();
        assert_eq!(first_text(empty), None);

        let blocked: GenerateResponse =
            serde_json::from_str(r#"{"candidates":[{"finishReason":"SAFETY"}]}"#).unwrap();
        assert_eq!(first_text(blocked), None);
    }

    #[test]
    fn test_upstream_message() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted"}}"#;
        assert_eq!(
            upstream_message(StatusCode::TOO_MANY_REQUESTS, body),
            "Resource has been exhausted"
        );
        assert!(upstream_message(StatusCode::BAD_GATEWAY, "oops").contains("502"));
    }

    #[test]
    fn test_config_endpoint_and_validation() {
        let config = GeminiConfig::new("k")
            .with_base_url("http://localhost:9999/")
            .with_model("gemini-test");
        assert_eq!(
            config.endpoint(),
            "http://localhost:9999/v1beta/models/gemini-test:generateContent"
        );

        assert!(matches!(
            GeminiClient::new(GeminiConfig::new("  ")),
            Err(BuildError::Configuration { .. })
        ));
    }
}
