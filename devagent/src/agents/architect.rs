//! Architect agent: [`Plan`] to an ordered [`TaskPlan`].

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::types::{Plan, TaskPlan};
use crate::io::model::{ChatModel, Message};
use crate::io::prompt::PromptBuilder;
use crate::io::structured::{OutputSchema, invoke_structured};

const TASK_PLAN_SCHEMA: &str = include_str!("../../schemas/task_plan.schema.json");

#[derive(Debug, Clone)]
pub struct ArchitectAgent {
    prompts: PromptBuilder,
    schema: OutputSchema,
}

impl ArchitectAgent {
    pub fn new(prompt_budget_bytes: usize) -> Result<Self> {
        Ok(Self {
            prompts: PromptBuilder::new(prompt_budget_bytes),
            schema: OutputSchema::parse("task_plan", TASK_PLAN_SCHEMA)?,
        })
    }

    /// One structured call; the returned task plan carries `plan` as its origin.
    #[instrument(skip_all, fields(plan = plan.name.as_str()))]
    pub fn run<M: ChatModel + ?Sized>(&self, model: &M, plan: &Plan) -> Result<TaskPlan> {
        let prompt = self.prompts.build_architect(plan)?.render();
        let mut task_plan: TaskPlan =
            invoke_structured(model, vec![Message::user(prompt)], &self.schema)
                .context("Architect did not return a valid response.")?;
        task_plan.plan = Some(plan.clone());

        let rendered = serde_json::to_string(&task_plan).context("serialize task plan")?;
        info!(steps = task_plan.len(), task_plan = %rendered, "task plan ready");
        Ok(task_plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedModel, json_reply, sample_plan, task_plan};

    #[test]
    fn architect_attaches_originating_plan() {
        let plan = sample_plan();
        let steps = task_plan(&[("index.html", "markup"), ("app.js", "logic")]);
        let model = ScriptedModel::new(vec![json_reply(&steps)]);
        let agent = ArchitectAgent::new(10_000).expect("agent");

        let got = agent.run(&model, &plan).expect("run");

        assert_eq!(got.implementation_steps, steps.implementation_steps);
        assert_eq!(got.plan, Some(plan.clone()));
        let prompt = model.requests()[0].messages[0]
            .content
            .clone()
            .unwrap_or_default();
        assert!(prompt.contains(&plan.description));
    }

    #[test]
    fn architect_rejects_reply_with_foreign_fields() {
        let plan = sample_plan();
        let model = ScriptedModel::new(vec![Message::assistant(
            r#"{"implementation_steps": [], "plan": {"name": "smuggled"}}"#,
        )]);
        let agent = ArchitectAgent::new(10_000).expect("agent");

        let err = agent.run(&model, &plan).unwrap_err();
        assert_eq!(err.to_string(), "Architect did not return a valid response.");
    }

    #[test]
    fn architect_accepts_empty_step_list() {
        let model = ScriptedModel::new(vec![Message::assistant(r#"{"implementation_steps": []}"#)]);
        let agent = ArchitectAgent::new(10_000).expect("agent");

        let got = agent.run(&model, &sample_plan()).expect("run");
        assert!(got.is_empty());
    }
}
