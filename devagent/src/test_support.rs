//! Test-only helpers: a scripted chat model and fixture builders.

use std::collections::VecDeque;
use std::sync::Mutex;

use anyhow::{Result, anyhow};
use serde::Serialize;
use serde_json::Value;

use crate::core::types::{ImplementationTask, Plan, PlannedFile, TaskPlan};
use crate::io::model::{ChatModel, ChatRequest, FunctionCall, Message, Role, ToolCall};

/// Chat model that replays canned replies in order and records every request.
///
/// Running out of replies is an error, so an unexpected extra model call fails
/// the test instead of hanging.
#[derive(Debug, Default)]
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Message>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl ScriptedModel {
    pub fn new(replies: Vec<Message>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests received so far, oldest first.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }

    pub fn remaining(&self) -> usize {
        self.replies.lock().map(|replies| replies.len()).unwrap_or(0)
    }
}

impl ChatModel for ScriptedModel {
    fn chat(&self, request: &ChatRequest) -> Result<Message> {
        self.requests
            .lock()
            .map_err(|_| anyhow!("scripted model request log poisoned"))?
            .push(request.clone());
        self.replies
            .lock()
            .map_err(|_| anyhow!("scripted model replies poisoned"))?
            .pop_front()
            .ok_or_else(|| anyhow!("scripted model has no replies left"))
    }
}

/// Assistant reply whose content is `value` serialized as JSON.
pub fn json_reply<T: Serialize>(value: &T) -> Message {
    Message::assistant(serde_json::to_string(value).unwrap_or_default())
}

/// Assistant reply that only requests tool calls.
pub fn tool_call_reply(calls: Vec<ToolCall>) -> Message {
    Message {
        role: Role::Assistant,
        content: None,
        tool_calls: calls,
        tool_call_id: None,
    }
}

pub fn tool_call(id: &str, name: &str, arguments: Value) -> ToolCall {
    ToolCall {
        id: id.to_string(),
        kind: "function".to_string(),
        function: FunctionCall {
            name: name.to_string(),
            arguments: arguments.to_string(),
        },
    }
}

/// Deterministic three-file web plan.
pub fn sample_plan() -> Plan {
    Plan {
        name: "Todo App".to_string(),
        description: "A colourful todo list that runs in the browser.".to_string(),
        techstack: "html, css, javascript".to_string(),
        features: vec![
            "Add todos".to_string(),
            "Mark todos done".to_string(),
        ],
        files: vec![
            planned("index.html", "page markup"),
            planned("style.css", "styling"),
            planned("app.js", "todo logic"),
        ],
    }
}

/// Task plan from `(filepath, task_description)` pairs, without an attached plan.
pub fn task_plan(steps: &[(&str, &str)]) -> TaskPlan {
    TaskPlan {
        implementation_steps: steps
            .iter()
            .map(|(filepath, task_description)| ImplementationTask {
                filepath: (*filepath).to_string(),
                task_description: (*task_description).to_string(),
            })
            .collect(),
        plan: None,
    }
}

fn planned(path: &str, purpose: &str) -> PlannedFile {
    PlannedFile {
        path: path.to_string(),
        purpose: purpose.to_string(),
    }
}
