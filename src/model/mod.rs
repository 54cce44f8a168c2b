//! Job output model
//!
//! Folds log events into commands and lines:
//! - `LogLine`: one line of text, open for appends until a newline is seen
//! - `Command`: one directive's lifetime and its lines
//! - `JobOutput`: the ordered commands of a job plus render bookkeeping

mod command;
mod job_output;
mod line;

use std::fmt;

pub use command::{Command, CommandError, CommandStatus, RenderingState};
pub use job_output::{Applied, JobOutput, KILLED_EXIT_CODE};
pub use line::{collapse_carriage_returns, LogLine};

/// Opaque unique identifier of a command within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CommandId(uuid::Uuid);

impl CommandId {
    pub fn new() -> Self {
        CommandId(uuid::Uuid::new_v4())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}
