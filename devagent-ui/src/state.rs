//! Shared application state for the UI server.

use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::Result;
use serde::Serialize;
use tokio::sync::broadcast;

use devagent::io::config::{AppConfig, ModelConfig};
use devagent::io::model::ChatModel;
use devagent::io::openai::OpenAiClient;

/// Events broadcast to SSE clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    RunStarted,
    StageStarted {
        stage: String,
    },
    StepCompleted {
        index: usize,
        total: usize,
        filepath: String,
    },
    RunCompleted {
        steps: usize,
    },
    RunFailed {
        error: String,
    },
    /// Something under the output directory was created, modified or removed.
    FilesChanged,
}

/// Lifecycle of the (single) generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "lowercase")]
pub enum RunStatus {
    Idle,
    Running,
    Completed { steps: usize },
    Failed { error: String },
}

/// Builds the chat model for one run. Called on the blocking worker.
pub type ModelFactory =
    Arc<dyn Fn(&ModelConfig) -> Result<Box<dyn ChatModel + Send>> + Send + Sync>;

/// Shared state accessible from all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// Absolute root of the generated project.
    pub output_dir: PathBuf,
    /// Broadcast sender for run and file change events.
    pub event_tx: Arc<broadcast::Sender<ChangeEvent>>,
    status: Arc<Mutex<RunStatus>>,
    pub model_factory: ModelFactory,
}

impl AppState {
    pub fn new(config: AppConfig, output_dir: PathBuf, model_factory: ModelFactory) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        Self {
            config: Arc::new(config),
            output_dir,
            event_tx: Arc::new(event_tx),
            status: Arc::new(Mutex::new(RunStatus::Idle)),
            model_factory,
        }
    }

    /// Factory for the configured OpenAI-compatible endpoint.
    pub fn openai_factory() -> ModelFactory {
        Arc::new(|cfg: &ModelConfig| {
            let client = OpenAiClient::from_config(cfg)?;
            Ok(Box::new(client) as Box<dyn ChatModel + Send>)
        })
    }

    pub fn status(&self) -> RunStatus {
        self.status
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Mark a run as started. Returns `false` if one is already running.
    pub fn try_start_run(&self) -> bool {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        if *status == RunStatus::Running {
            return false;
        }
        *status = RunStatus::Running;
        true
    }

    pub fn finish_run(&self, outcome: RunStatus) {
        *self.status.lock().unwrap_or_else(PoisonError::into_inner) = outcome;
    }

    /// Broadcast to connected clients; no subscribers is not an error.
    pub fn broadcast(&self, event: ChangeEvent) {
        let _ = self.event_tx.send(event);
    }
}
