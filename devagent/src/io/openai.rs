//! OpenAI-compatible chat-completions client (Groq, OpenAI, local gateways).

use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::io::config::ModelConfig;
use crate::io::model::{ChatModel, ChatRequest, Message};

/// Provider rejected a request or returned something unusable.
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    #[error("{provider} returned HTTP {status}: {body}")]
    Http {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("{provider} returned no choices")]
    EmptyResponse { provider: String },
}

/// Blocking client for `POST {base_url}/chat/completions`.
#[derive(Clone)]
pub struct OpenAiClient {
    http: Client,
    provider: String,
    url: String,
    model: String,
    api_key: String,
    temperature: Option<f32>,
}

impl OpenAiClient {
    /// Build a client from config, reading the API key from the environment.
    pub fn from_config(config: &ModelConfig) -> Result<Self> {
        let api_key = config.api_key()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("build http client")?;
        Ok(Self {
            http,
            provider: config.provider.clone(),
            url: chat_completions_url(&config.base_url),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })
    }
}

impl ChatModel for OpenAiClient {
    #[instrument(skip_all, fields(provider = %self.provider, model = %self.model))]
    fn chat(&self, request: &ChatRequest) -> Result<Message> {
        let payload = WireRequest {
            model: &self.model,
            messages: &request.messages,
            tools: request.tools.iter().map(|t| t.to_wire()).collect(),
            response_format: request.response_format.as_ref().map(|f| f.to_wire()),
            temperature: self.temperature,
        };

        info!(
            messages = request.messages.len(),
            tools = request.tools.len(),
            structured = request.response_format.is_some(),
            "sending chat completion"
        );

        let response = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .with_context(|| format!("POST {}", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            warn!(status = status.as_u16(), "chat completion failed");
            return Err(ModelError::Http {
                provider: self.provider.clone(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let parsed: WireResponse = response
            .json()
            .with_context(|| format!("parse response from {}", self.url))?;
        let message = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message)
            .ok_or_else(|| ModelError::EmptyResponse {
                provider: self.provider.clone(),
            })?;

        debug!(tool_calls = message.tool_calls.len(), "received chat completion");
        Ok(message)
    }
}

fn chat_completions_url(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: Message,
}
