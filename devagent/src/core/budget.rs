//! Node-execution budget for a pipeline run.

use thiserror::Error;

/// A run executed more graph nodes than the configured recursion limit allows.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("recursion limit of {limit} reached without hitting a stop condition")]
pub struct RecursionLimitError {
    pub limit: u32,
}

/// Counts node executions against a fixed ceiling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepBudget {
    limit: u32,
    used: u32,
}

impl StepBudget {
    pub fn new(limit: u32) -> Self {
        Self { limit, used: 0 }
    }

    /// Reserve one node execution.
    pub fn consume(&mut self) -> Result<(), RecursionLimitError> {
        if self.used >= self.limit {
            return Err(RecursionLimitError { limit: self.limit });
        }
        self.used += 1;
        Ok(())
    }

    pub fn used(&self) -> u32 {
        self.used
    }

    pub fn remaining(&self) -> u32 {
        self.limit - self.used
    }
}
