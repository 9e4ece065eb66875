//! Shared deterministic types passed between pipeline stages.
//!
//! These types define the stable contracts between the planner, architect and
//! coder. The serialized field names match the JSON schemas under `schemas/`
//! that constrain model output.

use serde::{Deserialize, Serialize};

/// A file the planner expects the project to contain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedFile {
    /// Project-relative path, e.g. `src/app.js`.
    pub path: String,
    /// What the file is for.
    pub purpose: String,
}

/// Structured result of the planning stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Short project name.
    pub name: String,
    /// One-paragraph description of what gets built.
    pub description: String,
    /// Languages and frameworks, e.g. `html, css, javascript`.
    pub techstack: String,
    /// User-facing features.
    pub features: Vec<String>,
    /// Files the project should contain.
    pub files: Vec<PlannedFile>,
}

/// One file-level unit of work for the coder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationTask {
    /// Project-relative path of the file to create or modify.
    pub filepath: String,
    /// Detailed description of what to implement in the file.
    pub task_description: String,
}

/// Ordered implementation steps produced by the architect.
///
/// `plan` is not produced by the model; the architect attaches the plan the
/// steps were derived from after parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub implementation_steps: Vec<ImplementationTask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
}

impl TaskPlan {
    pub fn len(&self) -> usize {
        self.implementation_steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.implementation_steps.is_empty()
    }
}
