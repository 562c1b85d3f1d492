//! OpenAI-compatible chat-completion summarizer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{AiError, Summarizer};
use crate::config::{AiConfig, HttpConfig};
use crate::utils::HttpClient;

/// Instruction sent ahead of the paper text
pub const ANALYSIS_PROMPT: &str = "Please analyze this paper and provide:
1. The main research question
2. The research method
3. The main findings
4. The novel contributions
5. The limitations

Answer concisely.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f64,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatContent,
}

#[derive(Debug, Deserialize)]
struct ChatContent {
    #[serde(default)]
    content: Option<String>,
}

/// Summarizer backed by a `/chat/completions` endpoint
#[derive(Debug, Clone)]
pub struct ChatSummarizer {
    client: HttpClient,
    endpoint: String,
    model: String,
    api_key: String,
    max_tokens: u32,
    temperature: f64,
}

impl ChatSummarizer {
    /// Build from configuration; an API key is required
    pub fn from_config(ai: &AiConfig, http: &HttpConfig) -> Result<Self, AiError> {
        let api_key = ai
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or(AiError::MissingApiKey)?;
        let client = HttpClient::from_settings(&http.api_settings())?;
        Ok(Self {
            client,
            endpoint: ai.endpoint.trim_end_matches('/').to_string(),
            model: ai.model.clone(),
            api_key,
            max_tokens: ai.max_tokens,
            temperature: ai.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn analyze(&self, text: &str) -> Result<String, AiError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: format!("{}\n\nPaper content:\n{}", ANALYSIS_PROMPT, text),
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        tracing::info!("Requesting analysis from {} ({} chars)", self.model, text.len());
        let response = self
            .client
            .post(&format!("{}/chat/completions", self.endpoint))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AiError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        parsed
            .choices
            .into_iter()
            .find_map(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(AiError::EmptyResponse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn summarizer(server: &mockito::ServerGuard) -> ChatSummarizer {
        let ai = AiConfig {
            endpoint: format!("{}/v1/", server.url()),
            api_key: Some("sk-test".to_string()),
            ..AiConfig::default()
        };
        ChatSummarizer::from_config(&ai, &HttpConfig::default()).unwrap()
    }

    #[test]
    fn test_requires_api_key() {
        let result = ChatSummarizer::from_config(&AiConfig::default(), &HttpConfig::default());
        assert!(matches!(result, Err(AiError::MissingApiKey)));
    }

    #[tokio::test]
    async fn test_analyze() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(serde_json::json!({
                "model": "qwen-max",
                "max_tokens": 1500
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":" 1. Question... "}}]}"#)
            .create_async()
            .await;

        let summary = summarizer(&server).analyze("Paper text").await.unwrap();
        assert_eq!(summary, "1. Question...");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_api_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body("invalid key")
            .create_async()
            .await;

        let err = summarizer(&server).analyze("Paper text").await.unwrap_err();
        assert!(matches!(err, AiError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_empty_choices() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[]}"#)
            .create_async()
            .await;

        let err = summarizer(&server).analyze("Paper text").await.unwrap_err();
        assert!(matches!(err, AiError::EmptyResponse));
    }
}
