//! Planner agent: free-text request to a structured [`Plan`].

use anyhow::{Context, Result, bail};
use tracing::{info, instrument};

use crate::core::types::Plan;
use crate::io::model::{ChatModel, Message};
use crate::io::prompt::PromptBuilder;
use crate::io::structured::{OutputSchema, invoke_structured};

const PLAN_SCHEMA: &str = include_str!("../../schemas/plan.schema.json");

#[derive(Debug, Clone)]
pub struct PlannerAgent {
    prompts: PromptBuilder,
    schema: OutputSchema,
}

impl PlannerAgent {
    pub fn new(prompt_budget_bytes: usize) -> Result<Self> {
        Ok(Self {
            prompts: PromptBuilder::new(prompt_budget_bytes),
            schema: OutputSchema::parse("plan", PLAN_SCHEMA)?,
        })
    }

    /// One structured call; no retries.
    #[instrument(skip_all)]
    pub fn run<M: ChatModel + ?Sized>(&self, model: &M, user_prompt: &str) -> Result<Plan> {
        if user_prompt.trim().is_empty() {
            bail!("empty user prompt");
        }
        let prompt = self.prompts.build_planner(user_prompt)?.render();
        let plan: Plan = invoke_structured(model, vec![Message::user(prompt)], &self.schema)
            .context("Planner did not return a valid response.")?;
        info!(name = plan.name.as_str(), files = plan.files.len(), "plan ready");
        Ok(plan)
    }
}
