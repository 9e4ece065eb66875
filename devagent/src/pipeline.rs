//! Graph driver: planner, architect, then the coder loop until DONE.

use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, instrument};

use crate::agents::architect::ArchitectAgent;
use crate::agents::coder::{CoderAgent, CoderStep};
use crate::agents::planner::PlannerAgent;
use crate::core::budget::StepBudget;
use crate::core::coder_state::CoderState;
use crate::core::graph::{Stage, next_stage};
use crate::core::types::{Plan, TaskPlan};
use crate::io::config::AppConfig;
use crate::io::model::ChatModel;
use crate::io::tools::ProjectTools;

/// Knobs for one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    pub output_dir: PathBuf,
    pub recursion_limit: u32,
    pub prompt_budget_bytes: usize,
    pub max_tool_rounds: u32,
    pub tool_output_limit_bytes: usize,
}

impl PipelineConfig {
    pub fn from_app(cfg: &AppConfig) -> Self {
        Self {
            output_dir: cfg.output_dir.clone(),
            recursion_limit: cfg.pipeline.recursion_limit,
            prompt_budget_bytes: cfg.pipeline.prompt_budget_bytes,
            max_tool_rounds: cfg.agent.max_tool_rounds,
            tool_output_limit_bytes: cfg.agent.tool_output_limit_bytes,
        }
    }
}

/// Progress notifications emitted while a run executes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    StageStarted {
        stage: Stage,
    },
    PlanReady {
        name: String,
        files: usize,
    },
    TaskPlanReady {
        steps: usize,
    },
    StepStarted {
        index: usize,
        total: usize,
        filepath: String,
    },
    StepCompleted {
        index: usize,
        total: usize,
        filepath: String,
        tool_calls: usize,
    },
    Finished {
        steps_executed: usize,
    },
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineOutcome {
    pub plan: Plan,
    pub task_plan: TaskPlan,
    pub steps_executed: usize,
    /// Graph nodes executed, the final DONE visit included.
    pub node_executions: u32,
}

/// Run the full pipeline for `user_prompt`, writing files under
/// `config.output_dir`.
///
/// Every stage visit counts against `config.recursion_limit`; exceeding it
/// fails with [`crate::core::budget::RecursionLimitError`]. Any stage error
/// stops the run immediately. Files already written stay on disk.
#[instrument(skip_all, fields(output_dir = %config.output_dir.display()))]
pub fn run_pipeline<M: ChatModel + ?Sized, F: FnMut(&PipelineEvent)>(
    model: &M,
    config: &PipelineConfig,
    user_prompt: &str,
    mut on_event: F,
) -> Result<PipelineOutcome> {
    let planner = PlannerAgent::new(config.prompt_budget_bytes)?;
    let architect = ArchitectAgent::new(config.prompt_budget_bytes)?;
    let tools = ProjectTools::new(&config.output_dir, config.tool_output_limit_bytes)
        .with_context(|| format!("prepare output dir {}", config.output_dir.display()))?;
    let coder = CoderAgent::new(tools, config.prompt_budget_bytes, config.max_tool_rounds);

    let mut budget = StepBudget::new(config.recursion_limit);
    let mut stage = Stage::ENTRY;
    let mut previous = None;
    let mut plan: Option<Plan> = None;
    let mut state: Option<CoderState> = None;
    let mut steps_executed = 0usize;

    while stage != Stage::End {
        budget.consume()?;
        if previous != Some(stage) {
            info!(stage = stage.as_str(), "stage started");
            on_event(&PipelineEvent::StageStarted { stage });
        }
        previous = Some(stage);

        let mut coder_done = false;
        match stage {
            Stage::Planner => {
                let produced = planner.run(model, user_prompt)?;
                on_event(&PipelineEvent::PlanReady {
                    name: produced.name.clone(),
                    files: produced.files.len(),
                });
                plan = Some(produced);
            }
            Stage::Architect => {
                let plan = plan.as_ref().context("architect reached without a plan")?;
                let task_plan = architect.run(model, plan)?;
                on_event(&PipelineEvent::TaskPlanReady {
                    steps: task_plan.len(),
                });
                state = Some(CoderState::new(task_plan));
            }
            Stage::Coder => {
                let state = state
                    .as_mut()
                    .context("coder reached without a task plan")?;
                let total = state.task_count();
                if let Some(task) = state.current_task() {
                    on_event(&PipelineEvent::StepStarted {
                        index: state.current_step_idx(),
                        total,
                        filepath: task.filepath.clone(),
                    });
                }
                match coder.run_step(model, state)? {
                    CoderStep::Done => coder_done = true,
                    CoderStep::Completed {
                        index,
                        filepath,
                        tool_calls,
                    } => {
                        steps_executed += 1;
                        on_event(&PipelineEvent::StepCompleted {
                            index,
                            total,
                            filepath,
                            tool_calls,
                        });
                    }
                }
            }
            Stage::End => {}
        }
        stage = next_stage(stage, coder_done);
    }

    let plan = plan.context("pipeline ended without a plan")?;
    let task_plan = state
        .map(CoderState::into_task_plan)
        .context("pipeline ended without a task plan")?;
    info!(
        steps_executed,
        node_executions = budget.used(),
        "pipeline finished"
    );
    on_event(&PipelineEvent::Finished { steps_executed });

    Ok(PipelineOutcome {
        plan,
        task_plan,
        steps_executed,
        node_executions: budget.used(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::budget::RecursionLimitError;
    use crate::io::model::Message;
    use crate::test_support::{ScriptedModel, json_reply, sample_plan, task_plan};

    fn config(temp: &tempfile::TempDir, recursion_limit: u32) -> PipelineConfig {
        PipelineConfig {
            output_dir: temp.path().join("out"),
            recursion_limit,
            prompt_budget_bytes: 10_000,
            max_tool_rounds: 5,
            tool_output_limit_bytes: 10_000,
        }
    }

    #[test]
    fn from_app_copies_limits() {
        let cfg = PipelineConfig::from_app(&AppConfig::default());
        assert_eq!(cfg.recursion_limit, 100);
        assert_eq!(cfg.max_tool_rounds, 25);
        assert_eq!(cfg.output_dir, PathBuf::from("generated_project"));
    }

    #[test]
    fn zero_tasks_finishes_after_single_coder_visit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            json_reply(&sample_plan()),
            json_reply(&task_plan(&[])),
        ]);
        let mut events = Vec::new();

        let outcome = run_pipeline(&model, &config(&temp, 10), "todo", |event| {
            events.push(event.clone());
        })
        .expect("run");

        assert_eq!(outcome.steps_executed, 0);
        assert_eq!(outcome.node_executions, 3);
        assert_eq!(model.requests().len(), 2);
        assert_eq!(
            events,
            vec![
                PipelineEvent::StageStarted {
                    stage: Stage::Planner
                },
                PipelineEvent::PlanReady {
                    name: "Todo App".to_string(),
                    files: sample_plan().files.len(),
                },
                PipelineEvent::StageStarted {
                    stage: Stage::Architect
                },
                PipelineEvent::TaskPlanReady { steps: 0 },
                PipelineEvent::StageStarted {
                    stage: Stage::Coder
                },
                PipelineEvent::Finished { steps_executed: 0 },
            ]
        );
    }

    #[test]
    fn each_task_gets_one_agent_turn() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            json_reply(&sample_plan()),
            json_reply(&task_plan(&[("a.js", "a"), ("b.js", "b")])),
            Message::assistant("first"),
            Message::assistant("second"),
        ]);
        let mut completed = Vec::new();

        let outcome = run_pipeline(&model, &config(&temp, 10), "todo", |event| {
            if let PipelineEvent::StepCompleted { filepath, .. } = event {
                completed.push(filepath.clone());
            }
        })
        .expect("run");

        assert_eq!(outcome.steps_executed, 2);
        assert_eq!(outcome.node_executions, 5);
        assert_eq!(completed, vec!["a.js", "b.js"]);
        assert_eq!(outcome.task_plan.plan, Some(sample_plan()));
    }

    #[test]
    fn recursion_limit_stops_long_runs() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![
            json_reply(&sample_plan()),
            json_reply(&task_plan(&[("a.js", "a"), ("b.js", "b")])),
            Message::assistant("first"),
            Message::assistant("second"),
        ]);

        let err = run_pipeline(&model, &config(&temp, 4), "todo", |_| {}).unwrap_err();

        assert_eq!(
            err.downcast_ref::<RecursionLimitError>(),
            Some(&RecursionLimitError { limit: 4 })
        );
    }

    #[test]
    fn planner_failure_stops_before_architect() {
        let temp = tempfile::tempdir().expect("tempdir");
        let model = ScriptedModel::new(vec![Message::assistant("not json")]);

        let err = run_pipeline(&model, &config(&temp, 10), "todo", |_| {}).unwrap_err();

        assert_eq!(err.to_string(), "Planner did not return a valid response.");
        assert_eq!(model.requests().len(), 1);
    }
}
