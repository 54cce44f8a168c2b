//! Command lifecycle and output accumulation.

use joblog_protocol::Timestamp;

use super::line::LogLine;
use super::CommandId;

/// Errors raised by command state transitions
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    /// A second `finish` for the same command. Indicates duplicated or
    /// malformed upstream events.
    #[error("Command {command_id} ('{directive}') is already finished")]
    AlreadyFinished {
        command_id: CommandId,
        directive: String,
    },
}

/// Where a command is in the incremental render cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderingState {
    /// Never rendered; the next tick renders it in full.
    Waiting,
    /// Rendered while still running; the next tick replaces its rendering.
    InProgress,
    /// Rendered after it finished; never touched again.
    Finished,
}

/// Derived pass/fail/running status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Running,
    Passed,
    Failed,
}

/// One shell directive and the output it produced.
#[derive(Debug, Clone)]
pub struct Command {
    id: CommandId,
    starting_line_number: u64,
    directive: String,
    started_at: Option<Timestamp>,
    finished_at: Option<Timestamp>,
    exit_code: Option<i32>,
    lines: Vec<LogLine>,
    pub(crate) rendering_state: RenderingState,
}

impl Command {
    /// Create a command whose directive occupies `starting_line_number`.
    pub fn new(
        directive: impl Into<String>,
        starting_line_number: u64,
        started_at: Option<Timestamp>,
    ) -> Self {
        Self {
            id: CommandId::new(),
            starting_line_number,
            directive: directive.into(),
            started_at,
            finished_at: None,
            exit_code: None,
            lines: Vec::new(),
            rendering_state: RenderingState::Waiting,
        }
    }

    pub fn id(&self) -> CommandId {
        self.id
    }

    /// Transcript line number of the directive itself.
    pub fn starting_line_number(&self) -> u64 {
        self.starting_line_number
    }

    pub fn directive(&self) -> &str {
        &self.directive
    }

    pub fn started_at(&self) -> Option<Timestamp> {
        self.started_at
    }

    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// Output lines, in order.
    pub fn lines(&self) -> &[LogLine] {
        &self.lines
    }

    pub fn rendering_state(&self) -> RenderingState {
        self.rendering_state
    }

    /// Fold one `cmd_output` chunk into the command.
    ///
    /// The chunk is split on `\n`. Text before the first newline extends the
    /// last line if that line is still incomplete; every piece followed by a
    /// newline is marked complete. A trailing newline does not open a new,
    /// empty line: the next chunk opens it when it has text.
    pub fn append(&mut self, output: &str, timestamp: Timestamp) {
        let mut pieces = output.split('\n').peekable();

        while let Some(piece) = pieces.next() {
            let is_last = pieces.peek().is_none();
            if is_last && piece.is_empty() {
                break;
            }

            let needs_new_line = self.lines.last().map_or(true, LogLine::is_complete);
            if needs_new_line {
                let number = self.starting_line_number + self.line_count() as u64;
                self.lines.push(LogLine::new(number, timestamp, self.id));
            }

            if let Some(line) = self.lines.last_mut() {
                line.append(piece, timestamp);
                if !is_last {
                    line.mark_complete();
                }
            }
        }
    }

    /// Record the command's exit. Fails if it already finished; the existing
    /// exit code and timestamp are left untouched.
    pub fn finish(&mut self, finished_at: Timestamp, exit_code: i32) -> Result<(), CommandError> {
        if self.is_finished() {
            return Err(CommandError::AlreadyFinished {
                command_id: self.id,
                directive: self.directive.clone(),
            });
        }

        self.finished_at = Some(finished_at);
        self.exit_code = Some(exit_code);
        Ok(())
    }

    /// Take the start time the server reported when the command exited.
    pub(crate) fn set_started_at(&mut self, started_at: Timestamp) {
        self.started_at = Some(started_at);
    }

    pub fn is_passed(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.exit_code, Some(code) if code != 0)
    }

    /// Still waiting for output: no finish has been recorded.
    pub fn is_fetching(&self) -> bool {
        self.finished_at.is_none()
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn has_empty_output(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of output lines (excluding the directive line).
    pub fn number_of_lines(&self) -> usize {
        self.lines.len()
    }

    /// Transcript lines occupied by this command: the directive line plus
    /// every output line.
    pub fn line_count(&self) -> usize {
        1 + self.lines.len()
    }

    pub fn status(&self) -> CommandStatus {
        if self.is_passed() {
            CommandStatus::Passed
        } else if self.is_failed() {
            CommandStatus::Failed
        } else {
            CommandStatus::Running
        }
    }

    /// Seconds between start and finish, when both are known.
    pub fn duration_seconds(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).max(0)),
            _ => None,
        }
    }

    /// Output as it was streamed, minus carriage-return overwrites.
    pub fn output_text(&self) -> String {
        let mut text = String::new();
        for line in &self.lines {
            text.push_str(line.output());
            if line.is_complete() {
                text.push('\n');
            }
        }
        text
    }
}
