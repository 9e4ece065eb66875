//! Structured-output calls: JSON Schema constrained replies parsed into types.
//!
//! The schema is sent as the response format and the reply is validated
//! against the same schema (Draft 2020-12) before deserializing, so a
//! provider that ignores the response format still cannot hand the pipeline
//! a malformed plan.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use jsonschema::Draft;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::io::model::{ChatModel, ChatRequest, Message, ResponseFormat};

/// The model reply could not be turned into the requested structure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructuredOutputError {
    #[error("{schema}: model returned no content")]
    MissingContent { schema: String },
    #[error("{schema}: reply is not valid JSON: {message}")]
    InvalidJson { schema: String, message: String },
    #[error("{schema}: schema validation failed:\n- {}", violations.join("\n- "))]
    SchemaViolations {
        schema: String,
        violations: Vec<String>,
    },
}

/// A named JSON Schema used to constrain and check model output.
#[derive(Debug, Clone)]
pub struct OutputSchema {
    name: String,
    schema: Value,
}

impl OutputSchema {
    pub fn parse(name: &str, raw: &str) -> Result<Self> {
        let schema: Value =
            serde_json::from_str(raw).with_context(|| format!("parse {name} schema json"))?;
        Ok(Self {
            name: name.to_string(),
            schema,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn response_format(&self) -> ResponseFormat {
        ResponseFormat {
            name: self.name.clone(),
            schema: self.schema.clone(),
        }
    }

    /// Validate `instance`, returning every violation message.
    pub fn validate(&self, instance: &Value) -> Result<Vec<String>> {
        let compiled = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(&self.schema)
            .with_context(|| format!("compile {} schema", self.name))?;
        Ok(compiled
            .iter_errors(instance)
            .map(|err| err.to_string())
            .collect())
    }

    /// Parse a reply into `T`, enforcing the schema.
    pub fn parse_reply<T: DeserializeOwned>(&self, reply: &Message) -> Result<T> {
        let text = reply
            .text_content()
            .ok_or_else(|| StructuredOutputError::MissingContent {
                schema: self.name.clone(),
            })?;
        let instance: Value = serde_json::from_str(strip_code_fence(text)).map_err(|err| {
            StructuredOutputError::InvalidJson {
                schema: self.name.clone(),
                message: err.to_string(),
            }
        })?;

        let violations = self.validate(&instance)?;
        if !violations.is_empty() {
            return Err(StructuredOutputError::SchemaViolations {
                schema: self.name.clone(),
                violations,
            }
            .into());
        }

        let value = serde_json::from_value(instance).map_err(|err| {
            StructuredOutputError::SchemaViolations {
                schema: self.name.clone(),
                violations: vec![err.to_string()],
            }
        })?;
        Ok(value)
    }
}

/// Ask `model` for a reply matching `schema` and parse it into `T`.
#[instrument(skip_all, fields(schema = schema.name()))]
pub fn invoke_structured<M: ChatModel + ?Sized, T: DeserializeOwned>(
    model: &M,
    messages: Vec<Message>,
    schema: &OutputSchema,
) -> Result<T> {
    let request = ChatRequest {
        messages,
        tools: Vec::new(),
        response_format: Some(schema.response_format()),
    };
    let reply = model.chat(&request)?;
    debug!(
        content_bytes = reply.content.as_deref().map_or(0, str::len),
        "structured reply received"
    );
    schema.parse_reply(&reply)
}

/// Drop a surrounding markdown code fence, if any.
fn strip_code_fence(text: &str) -> &str {
    static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?s)^```[A-Za-z0-9_-]*\s*\n(.*?)\n?```$").expect("fence regex should compile")
    });
    let trimmed = text.trim();
    match FENCE_RE.captures(trimmed).and_then(|caps| caps.get(1)) {
        Some(inner) => inner.as_str(),
        None => trimmed,
    }
}
