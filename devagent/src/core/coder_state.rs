//! Progress cursor over a [`TaskPlan`].
//!
//! The cursor only moves forward through [`CoderState::advance`] and never
//! passes the task count, so a loop driven by [`CoderState::status`] visits
//! every task exactly once and then stops.

use crate::core::types::{ImplementationTask, TaskPlan};

/// Whether the coder still has tasks to work on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoderStatus {
    /// `index < task count`.
    Working,
    /// `index == task count`.
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoderState {
    task_plan: TaskPlan,
    current_step_idx: usize,
}

impl CoderState {
    pub fn new(task_plan: TaskPlan) -> Self {
        Self {
            task_plan,
            current_step_idx: 0,
        }
    }

    pub fn status(&self) -> CoderStatus {
        if self.current_step_idx >= self.task_plan.len() {
            CoderStatus::Done
        } else {
            CoderStatus::Working
        }
    }

    /// Task at the cursor, or `None` once done.
    pub fn current_task(&self) -> Option<&ImplementationTask> {
        self.task_plan
            .implementation_steps
            .get(self.current_step_idx)
    }

    pub fn current_step_idx(&self) -> usize {
        self.current_step_idx
    }

    pub fn task_count(&self) -> usize {
        self.task_plan.len()
    }

    pub fn task_plan(&self) -> &TaskPlan {
        &self.task_plan
    }

    /// Move to the next task. Returns `false` (and does nothing) when already done.
    pub fn advance(&mut self) -> bool {
        if self.status() == CoderStatus::Done {
            return false;
        }
        self.current_step_idx += 1;
        true
    }

    pub fn into_task_plan(self) -> TaskPlan {
        self.task_plan
    }
}
