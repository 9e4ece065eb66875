//! Background generation runs started from `POST /api/generate`.

use anyhow::Result;
use tracing::{info, warn};

use devagent::pipeline::{PipelineConfig, PipelineEvent, PipelineOutcome, run_pipeline};

use crate::state::{AppState, ChangeEvent, RunStatus};

/// Run the pipeline on a blocking worker. The caller must have claimed the run
/// slot with [`AppState::try_start_run`].
pub fn spawn_generation(state: AppState, prompt: String) {
    tokio::task::spawn_blocking(move || run_generation(&state, &prompt));
}

pub fn run_generation(state: &AppState, prompt: &str) {
    state.broadcast(ChangeEvent::RunStarted);
    info!(prompt_bytes = prompt.len(), "generation started");

    match execute(state, prompt) {
        Ok(outcome) => {
            info!(steps = outcome.steps_executed, "generation completed");
            state.finish_run(RunStatus::Completed {
                steps: outcome.steps_executed,
            });
            state.broadcast(ChangeEvent::RunCompleted {
                steps: outcome.steps_executed,
            });
        }
        Err(err) => {
            let error = format!("❌ Error: {err:#}");
            warn!(error = %error, "generation failed");
            state.finish_run(RunStatus::Failed {
                error: error.clone(),
            });
            state.broadcast(ChangeEvent::RunFailed { error });
        }
    }
}

fn execute(state: &AppState, prompt: &str) -> Result<PipelineOutcome> {
    let model = (state.model_factory)(&state.config.model)?;
    let config = PipelineConfig {
        output_dir: state.output_dir.clone(),
        ..PipelineConfig::from_app(&state.config)
    };
    run_pipeline(&model, &config, prompt, |event| {
        if let Some(change) = forwarded(event) {
            state.broadcast(change);
        }
    })
}

fn forwarded(event: &PipelineEvent) -> Option<ChangeEvent> {
    match event {
        PipelineEvent::StageStarted { stage } => Some(ChangeEvent::StageStarted {
            stage: stage.as_str().to_string(),
        }),
        PipelineEvent::StepCompleted {
            index,
            total,
            filepath,
            ..
        } => Some(ChangeEvent::StepCompleted {
            index: *index,
            total: *total,
            filepath: filepath.clone(),
        }),
        _ => None,
    }
}
