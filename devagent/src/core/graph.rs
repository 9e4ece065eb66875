//! Stage transitions of the generation pipeline.
//!
//! ```text
//! planner -> architect -> coder -+-> end
//!                          ^     |
//!                          +-----+  (while tasks remain)
//! ```

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Planner,
    Architect,
    Coder,
    End,
}

impl Stage {
    pub const ENTRY: Stage = Stage::Planner;

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Planner => "planner",
            Stage::Architect => "architect",
            Stage::Coder => "coder",
            Stage::End => "end",
        }
    }
}

/// Return the stage that follows `current`.
///
/// `coder_done` is only consulted for [`Stage::Coder`]: the coder loops on
/// itself until a visit reports that no tasks remain.
pub fn next_stage(current: Stage, coder_done: bool) -> Stage {
    match current {
        Stage::Planner => Stage::Architect,
        Stage::Architect => Stage::Coder,
        Stage::Coder if coder_done => Stage::End,
        Stage::Coder => Stage::Coder,
        Stage::End => Stage::End,
    }
}
