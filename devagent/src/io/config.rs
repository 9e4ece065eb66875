//! Pipeline configuration stored in `devagent.toml`.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "devagent.toml";

/// Top-level configuration (TOML).
///
/// Missing fields default to the values the pipeline was tuned with, so an
/// empty file (or no file at all) is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Root directory that generated files are written to.
    pub output_dir: PathBuf,
    pub model: ModelConfig,
    pub pipeline: PipelineSettings,
    pub agent: AgentSettings,
}

/// OpenAI-compatible chat-completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Provider label used in logs.
    pub provider: String,
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PipelineSettings {
    /// Maximum graph node executions per run.
    pub recursion_limit: u32,
    /// Maximum bytes of a rendered prompt before existing content is truncated.
    pub prompt_budget_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentSettings {
    /// Maximum assistant replies with tool calls in one coder turn.
    pub max_tool_rounds: u32,
    /// Truncate tool results beyond this many bytes before returning them to the model.
    pub tool_output_limit_bytes: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("generated_project"),
            model: ModelConfig::default(),
            pipeline: PipelineSettings::default(),
            agent: AgentSettings::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "groq".to_string(),
            base_url: "https://api.groq.com/openai/v1".to_string(),
            model: "openai/gpt-oss-120b".to_string(),
            api_key_env: "GROQ_API_KEY".to_string(),
            temperature: None,
            request_timeout_secs: 300,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
            prompt_budget_bytes: 60_000,
        }
    }
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            max_tool_rounds: 25,
            tool_output_limit_bytes: 100_000,
        }
    }
}

impl AppConfig {
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(anyhow!("output_dir must be non-empty"));
        }
        if self.model.base_url.trim().is_empty() {
            return Err(anyhow!("model.base_url must be non-empty"));
        }
        if self.model.model.trim().is_empty() {
            return Err(anyhow!("model.model must be non-empty"));
        }
        if self.model.api_key_env.trim().is_empty() {
            return Err(anyhow!("model.api_key_env must be non-empty"));
        }
        if self.model.request_timeout_secs == 0 {
            return Err(anyhow!("model.request_timeout_secs must be > 0"));
        }
        if self.pipeline.recursion_limit == 0 {
            return Err(anyhow!("pipeline.recursion_limit must be > 0"));
        }
        if self.pipeline.prompt_budget_bytes == 0 {
            return Err(anyhow!("pipeline.prompt_budget_bytes must be > 0"));
        }
        if self.agent.max_tool_rounds == 0 {
            return Err(anyhow!("agent.max_tool_rounds must be > 0"));
        }
        if self.agent.tool_output_limit_bytes == 0 {
            return Err(anyhow!("agent.tool_output_limit_bytes must be > 0"));
        }
        Ok(())
    }
}

impl ModelConfig {
    /// Read the API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        let key = env::var(&self.api_key_env)
            .with_context(|| format!("read API key from ${}", self.api_key_env))?;
        if key.trim().is_empty() {
            return Err(anyhow!("${} is set but empty", self.api_key_env));
        }
        Ok(key)
    }
}

/// Load `.env` from the working directory if present.
///
/// Variables already set in the environment win.
pub fn load_dotenv() {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `AppConfig::default()`.
pub fn load_config(path: &Path) -> Result<AppConfig> {
    if !path.exists() {
        let cfg = AppConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: AppConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &AppConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
