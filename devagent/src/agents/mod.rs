//! Stage agents: planner, architect and the tool-using coder.

pub mod architect;
pub mod coder;
pub mod planner;
pub mod react;
