use futures::StreamExt;
use futures::stream;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Response, Url};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::{Config, Credential};
use crate::error::{InvocationError, StartupError};
use crate::inference::{FragmentStream, GenerationRequest, InferenceClient, InferenceFuture};
use crate::model::Message;
use crate::providers::http_errors::{
    model_api_request_error, model_api_status_error, model_api_stream_error,
};
use crate::providers::sse::{self, remote_error_message};

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for the Hugging Face inference router and other
/// OpenAI-compatible endpoints.
#[derive(Debug, Clone)]
pub struct HfInferenceClient {
    http: Client,
    api_url: String,
    credential: Credential,
    model: String,
    timeout_secs: Option<u64>,
}

impl HfInferenceClient {
    pub fn new(cfg: &Config) -> Result<Self, StartupError> {
        if cfg.credential.expose().trim().is_empty() {
            return Err(StartupError::MissingCredential {
                var: crate::config::CREDENTIAL_VAR,
            });
        }

        let model = cfg.model.trim();
        if model.is_empty() || model.chars().any(char::is_whitespace) {
            return Err(StartupError::InvalidModel {
                model: cfg.model.clone(),
            });
        }

        let base_url =
            Url::parse(&cfg.model_base_url).map_err(|err| StartupError::InvalidBaseUrl {
                url: cfg.model_base_url.clone(),
                reason: err.to_string(),
            })?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(StartupError::InvalidBaseUrl {
                url: cfg.model_base_url.clone(),
                reason: format!("unsupported scheme '{}'", base_url.scheme()),
            });
        }

        let mut builder = Client::builder();
        if let Some(secs) = cfg.model_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder.build().map_err(StartupError::HttpClient)?;

        Ok(Self {
            http,
            api_url: chat_completions_url(&cfg.model_base_url),
            credential: cfg.credential.clone(),
            model: model.to_string(),
            timeout_secs: cfg.model_timeout_secs,
        })
    }

    pub fn api_url(&self) -> &str {
        &self.api_url
    }

    async fn send(&self, request: &GenerationRequest<'_>) -> Result<Response, InvocationError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: to_chat_messages(request.messages),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            stream: request.stream,
        };
        debug!(
            api_url = %self.api_url,
            model = %self.model,
            message_count = request.messages.len(),
            stream = request.stream,
            "sending chat completion request"
        );

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(self.credential.expose())
            .json(&body)
            .send()
            .await
            .map_err(|err| {
                warn!(
                    api_url = %self.api_url,
                    model = %self.model,
                    error = %err,
                    "chat completion request failed"
                );
                model_api_request_error(err, &self.api_url, self.timeout_secs)
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let response_body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());
            warn!(
                api_url = %self.api_url,
                model = %self.model,
                status = %status,
                response_body_len = response_body.len(),
                "model API returned non-success status"
            );
            return Err(model_api_status_error(status, response_body));
        }

        Ok(response)
    }

    async fn read_completion(&self, response: Response) -> Result<String, InvocationError> {
        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|err| InvocationError::MalformedChunk {
                    reason: err.to_string(),
                })?;
        if let Some(error) = parsed.error {
            return Err(InvocationError::Remote {
                message: remote_error_message(&error),
            });
        }

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        debug!(
            model = %self.model,
            response_len = content.len(),
            "received chat completion response"
        );
        Ok(content)
    }
}

impl InferenceClient for HfInferenceClient {
    fn generate<'a>(&'a self, request: GenerationRequest<'a>) -> InferenceFuture<'a> {
        Box::pin(async move {
            let response = self.send(&request).await?;

            if request.stream && !is_json_response(&response) {
                let bytes = response
                    .bytes_stream()
                    .map(|chunk| chunk.map_err(model_api_stream_error));
                let fragments: FragmentStream<'a> = Box::pin(sse::fragment_stream(bytes));
                return Ok(fragments);
            }
            if request.stream {
                debug!(
                    model = %self.model,
                    "model API answered a streaming request with a JSON body"
                );
            }

            let content = self.read_completion(response).await?;
            let fragments: Vec<Result<String, InvocationError>> = if content.is_empty() {
                Vec::new()
            } else {
                vec![Ok(content)]
            };
            let fragments: FragmentStream<'a> = Box::pin(stream::iter(fragments));
            Ok(fragments)
        })
    }

    fn model(&self) -> &str {
        &self.model
    }
}

fn is_json_response(response: &Response) -> bool {
    response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.to_ascii_lowercase().contains("json"))
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn to_chat_messages(messages: &[Message]) -> Vec<ChatMessage<'_>> {
    messages
        .iter()
        .map(|msg| ChatMessage {
            role: msg.role.as_str(),
            content: &msg.content,
        })
        .collect()
}
