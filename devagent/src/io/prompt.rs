//! Prompt builders for the planner, architect and coder.

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use tracing::debug;

use crate::core::types::{ImplementationTask, Plan};

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const ARCHITECT_TEMPLATE: &str = include_str!("prompts/architect.md");
const CODER_SYSTEM_TEMPLATE: &str = include_str!("prompts/coder_system.md");
const CODER_TASK_TEMPLATE: &str = include_str!("prompts/coder_task.md");

const TRUNCATED_MARKER: &str = "\n[truncated]";

/// Template engine wrapper around minijinja.
struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)?;
        env.add_template("architect", ARCHITECT_TEMPLATE)?;
        env.add_template("coder_system", CODER_SYSTEM_TEMPLATE)?;
        env.add_template("coder_task", CODER_TASK_TEMPLATE)?;
        Ok(Self { env })
    }

    fn render(&self, name: &str, ctx: minijinja::Value) -> Result<String> {
        let template = self.env.get_template(name)?;
        let rendered = template
            .render(ctx)
            .with_context(|| format!("render {name} prompt"))?;
        Ok(rendered)
    }
}

/// Builds stage prompts, keeping the coder prompt within a byte budget.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    budget_bytes: usize,
}

impl PromptBuilder {
    /// Create a builder with the given byte budget.
    pub fn new(budget_bytes: usize) -> Self {
        Self { budget_bytes }
    }

    pub fn build_planner(&self, user_prompt: &str) -> Result<PromptPack> {
        let content = PromptEngine::new()?.render(
            "planner",
            context! { user_prompt => user_prompt.trim() },
        )?;
        Ok(PromptPack { content })
    }

    /// The architect sees the plan as pretty-printed JSON.
    pub fn build_architect(&self, plan: &Plan) -> Result<PromptPack> {
        let plan_json = serde_json::to_string_pretty(plan).context("serialize plan")?;
        let content =
            PromptEngine::new()?.render("architect", context! { plan => plan_json })?;
        Ok(PromptPack { content })
    }

    pub fn build_coder_system(&self) -> Result<PromptPack> {
        let content = PromptEngine::new()?.render("coder_system", context! {})?;
        Ok(PromptPack { content })
    }

    /// Per-task coder prompt. `existing` is cut down first when over budget.
    pub fn build_coder_task(&self, task: &ImplementationTask, existing: &str) -> Result<PromptPack> {
        let engine = PromptEngine::new()?;
        let render = |existing: &str| {
            engine.render(
                "coder_task",
                context! {
                    task_description => task.task_description.as_str(),
                    filepath => task.filepath.as_str(),
                    existing => existing,
                },
            )
        };

        let content = render(existing)?;
        if content.len() <= self.budget_bytes {
            return Ok(PromptPack { content });
        }

        let overhead = content.len() - existing.len();
        let allowed = self.budget_bytes.saturating_sub(overhead);
        let trimmed = truncate_with_marker(existing, allowed);
        debug!(
            filepath = task.filepath.as_str(),
            before_len = existing.len(),
            after_len = trimmed.len(),
            "truncated existing content for budget"
        );
        Ok(PromptPack {
            content: render(&trimmed)?,
        })
    }
}

/// A rendered prompt ready to send to the model.
#[derive(Debug, Clone)]
pub struct PromptPack {
    content: String,
}

impl PromptPack {
    /// Get the rendered prompt content.
    pub fn render(&self) -> String {
        self.content.clone()
    }
}

/// Cut `text` to at most `limit` bytes on a char boundary, marking the cut.
pub fn truncate_with_marker(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let keep = limit.saturating_sub(TRUNCATED_MARKER.len());
    let mut end = keep;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let mut out = text[..end].to_string();
    if limit > TRUNCATED_MARKER.len() {
        out.push_str(TRUNCATED_MARKER);
    }
    out
}
