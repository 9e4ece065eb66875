//! Prompt-to-project generator driven by a chat model.
//!
//! A run passes through three stages: the planner turns a free-text request
//! into a [`core::types::Plan`], the architect breaks the plan into ordered
//! file-level tasks, and the coder works through the tasks one agent turn at a
//! time, writing files through sandboxed tools.
//!
//! - **[`core`]**: Pure, deterministic logic (stage transitions, coder cursor,
//!   recursion budget, path containment). No I/O.
//! - **[`io`]**: Side-effecting operations (config, HTTP model client, prompt
//!   rendering, tools, the generated project tree).
//! - **[`agents`]**: One wrapper per stage on top of `io`.
//!
//! [`pipeline::run_pipeline`] drives the stages and is shared by the CLI and
//! the web UI.

pub mod agents;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
