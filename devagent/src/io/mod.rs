//! I/O helpers for pipeline stages: config, model access, prompts, tools and
//! the generated project tree.

pub mod config;
pub mod model;
pub mod openai;
pub mod project;
pub mod prompt;
pub mod structured;
pub mod tools;
