//! Coder agent: one tool-using turn per implementation task.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::agents::react::ToolAgent;
use crate::core::coder_state::CoderState;
use crate::io::model::ChatModel;
use crate::io::prompt::PromptBuilder;
use crate::io::tools::ProjectTools;

/// Result of one coder visit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoderStep {
    /// No tasks remained; nothing was done.
    Done,
    /// The task at `index` was handed to the agent and the cursor advanced.
    Completed {
        index: usize,
        filepath: String,
        tool_calls: usize,
    },
}

#[derive(Debug, Clone)]
pub struct CoderAgent {
    tools: ProjectTools,
    prompts: PromptBuilder,
    max_tool_rounds: u32,
}

impl CoderAgent {
    pub fn new(tools: ProjectTools, prompt_budget_bytes: usize, max_tool_rounds: u32) -> Self {
        Self {
            tools,
            prompts: PromptBuilder::new(prompt_budget_bytes),
            max_tool_rounds,
        }
    }

    pub fn tools(&self) -> &ProjectTools {
        &self.tools
    }

    /// Work on the task under the cursor, or report [`CoderStep::Done`].
    ///
    /// The DONE check happens before any work. Errors leave the cursor where
    /// it was.
    #[instrument(skip_all, fields(index = state.current_step_idx(), total = state.task_count()))]
    pub fn run_step<M: ChatModel + ?Sized>(
        &self,
        model: &M,
        state: &mut CoderState,
    ) -> Result<CoderStep> {
        let Some(task) = state.current_task().cloned() else {
            return Ok(CoderStep::Done);
        };
        let index = state.current_step_idx();

        let existing = self
            .tools
            .read_file(&task.filepath)
            .with_context(|| format!("load existing content for {}", task.filepath))?;
        let system_prompt = self.prompts.build_coder_system()?.render();
        let user_prompt = self.prompts.build_coder_task(&task, &existing)?.render();

        let turn = ToolAgent::new(&self.tools, self.max_tool_rounds)
            .run(model, system_prompt, user_prompt)
            .with_context(|| format!("coder step {} ({})", index + 1, task.filepath))?;

        state.advance();
        info!(
            filepath = task.filepath.as_str(),
            tool_calls = turn.tool_calls.len(),
            "coder step completed"
        );
        Ok(CoderStep::Completed {
            index,
            filepath: task.filepath,
            tool_calls: turn.tool_calls.len(),
        })
    }
}
