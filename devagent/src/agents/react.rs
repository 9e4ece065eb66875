//! Tool-using agent turn: let the model call tools until it answers in text.

use anyhow::Result;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::io::model::{ChatModel, ChatRequest, Message};
use crate::io::tools::ProjectTools;

/// The model kept requesting tools past the configured round limit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("agent still calling tools after {max_rounds} rounds")]
pub struct ToolRoundsExceededError {
    pub max_rounds: u32,
}

/// Summary of one finished agent turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentTurn {
    /// Assistant replies that carried tool calls.
    pub rounds: u32,
    /// Names of the tools called, in call order.
    pub tool_calls: Vec<String>,
    /// Final assistant text, if any.
    pub final_message: Option<String>,
}

/// ReAct-style loop over a set of project tools.
#[derive(Debug, Clone, Copy)]
pub struct ToolAgent<'a> {
    tools: &'a ProjectTools,
    max_rounds: u32,
}

impl<'a> ToolAgent<'a> {
    pub fn new(tools: &'a ProjectTools, max_rounds: u32) -> Self {
        Self { tools, max_rounds }
    }

    #[instrument(skip_all, fields(max_rounds = self.max_rounds))]
    pub fn run<M: ChatModel + ?Sized>(
        &self,
        model: &M,
        system_prompt: String,
        user_prompt: String,
    ) -> Result<AgentTurn> {
        let specs = self.tools.specs();
        let mut messages = vec![Message::system(system_prompt), Message::user(user_prompt)];
        let mut rounds = 0u32;
        let mut tool_calls = Vec::new();

        loop {
            let reply = model.chat(&ChatRequest {
                messages: messages.clone(),
                tools: specs.clone(),
                response_format: None,
            })?;

            if reply.tool_calls.is_empty() {
                debug!(rounds, tool_calls = tool_calls.len(), "agent turn finished");
                return Ok(AgentTurn {
                    rounds,
                    tool_calls,
                    final_message: reply.text_content().map(str::to_string),
                });
            }
            if rounds >= self.max_rounds {
                return Err(ToolRoundsExceededError {
                    max_rounds: self.max_rounds,
                }
                .into());
            }
            rounds += 1;

            let results: Vec<Message> = reply
                .tool_calls
                .iter()
                .map(|call| {
                    tool_calls.push(call.function.name.clone());
                    Message::tool_result(call.id.clone(), self.tools.call(call))
                })
                .collect();
            messages.push(reply);
            messages.extend(results);
        }
    }
}
