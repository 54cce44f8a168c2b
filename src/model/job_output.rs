//! Ordered commands of one job.

use joblog_protocol::{Event, JobResult, Timestamp};

use super::command::{Command, CommandError, RenderingState};

/// Exit code recorded for a command that was still running when the job ended.
pub const KILLED_EXIT_CODE: i32 = -1;

/// What folding a single event did to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// The event changed the model.
    Changed,
    /// The event was valid but had nothing to act on (unknown kind, output
    /// before any command, job end with no open command).
    Ignored,
}

/// Every command of a job, in start order.
#[derive(Debug, Clone, Default)]
pub struct JobOutput {
    commands: Vec<Command>,
    total_line_count: u64,
    result: Option<JobResult>,
    finished_at: Option<Timestamp>,
}

impl JobOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn last_command(&self) -> Option<&Command> {
        self.commands.last()
    }

    /// Transcript lines across all commands, directive lines included.
    pub fn total_line_count(&self) -> u64 {
        self.total_line_count
    }

    /// Result reported by `job_finished`, once seen.
    pub fn result(&self) -> Option<JobResult> {
        self.result
    }

    /// When `job_finished` was received.
    pub fn finished_at(&self) -> Option<Timestamp> {
        self.finished_at
    }

    /// Fold one event, dispatching on its kind.
    pub fn apply(&mut self, event: &Event) -> Result<Applied, CommandError> {
        match event {
            Event::CommandStarted {
                directive,
                timestamp,
            } => {
                self.create_command(directive, *timestamp);
                Ok(Applied::Changed)
            }
            Event::CommandOutput { output, timestamp } => Ok(self.append(output, *timestamp)),
            Event::CommandFinished {
                exit_code,
                timestamp,
                directive,
                started_at,
                finished_at,
            } => {
                if let Some(last) = self.commands.last_mut().filter(|c| c.is_fetching()) {
                    if let Some(reported) = directive.as_deref().filter(|d| *d != last.directive()) {
                        tracing::warn!(
                            running = last.directive(),
                            reported,
                            "cmd_finished names a different directive than the running command"
                        );
                    }
                    if let Some(started_at) = started_at {
                        last.set_started_at(*started_at);
                    }
                }
                self.finish_last_command(finished_at.unwrap_or(*timestamp), *exit_code)
            }
            Event::JobFinished { result, timestamp } => {
                self.result = Some(*result);
                self.finished_at = Some(*timestamp);

                let has_open_command = self.last_command().map_or(false, Command::is_fetching);
                if has_open_command {
                    self.kill_last_command(*timestamp)
                } else {
                    Ok(Applied::Ignored)
                }
            }
            Event::Unknown => Ok(Applied::Ignored),
        }
    }

    /// Start a new command. Its directive takes the next transcript line.
    ///
    /// A previous command that never reported its exit is closed as killed
    /// at this start time, so only the newest command can still be running.
    pub fn create_command(&mut self, directive: &str, started_at: Timestamp) -> &Command {
        if let Some(open) = self.commands.last_mut().filter(|c| c.is_fetching()) {
            tracing::warn!(
                previous = open.directive(),
                next = directive,
                "command started before the previous one finished, closing it as killed"
            );
            let _ = open.finish(started_at, KILLED_EXIT_CODE);
        }

        let command = Command::new(directive, self.total_line_count + 1, Some(started_at));
        self.commands.push(command);
        self.total_line_count += 1;

        &self.commands[self.commands.len() - 1]
    }

    /// Append output to the last command.
    pub fn append(&mut self, output: &str, timestamp: Timestamp) -> Applied {
        let Some(command) = self.commands.last_mut() else {
            tracing::warn!(bytes = output.len(), "dropping output received before any command started");
            return Applied::Ignored;
        };

        command.append(output, timestamp);
        self.recount_lines();
        Applied::Changed
    }

    /// Finish the last command with the exit code it reported.
    pub fn finish_last_command(
        &mut self,
        finished_at: Timestamp,
        exit_code: i32,
    ) -> Result<Applied, CommandError> {
        match self.commands.last_mut() {
            Some(command) => {
                command.finish(finished_at, exit_code)?;
                Ok(Applied::Changed)
            }
            None => Ok(Applied::Ignored),
        }
    }

    /// Finish the last command because the job itself ended under it.
    /// The exit code is always [`KILLED_EXIT_CODE`], whatever the job result.
    pub fn kill_last_command(&mut self, finished_at: Timestamp) -> Result<Applied, CommandError> {
        self.finish_last_command(finished_at, KILLED_EXIT_CODE)
    }

    /// Commands that were never rendered.
    pub fn commands_waiting_to_be_rendered(&self) -> Vec<&Command> {
        self.commands
            .iter()
            .filter(|c| c.rendering_state() == RenderingState::Waiting)
            .collect()
    }

    /// The command rendered while it was still running. Only the last
    /// command can be open, so after a render there is at most one.
    pub fn command_with_rendering_in_progress(&self) -> Option<&Command> {
        self.commands
            .iter()
            .find(|c| c.rendering_state() == RenderingState::InProgress)
    }

    /// Record that the view is up to date. Finished commands are never
    /// rendered again; running ones are re-rendered on the next tick.
    pub fn mark_all_commands_as_rendered(&mut self) {
        for command in &mut self.commands {
            command.rendering_state = if command.is_finished() {
                RenderingState::Finished
            } else {
                RenderingState::InProgress
            };
        }
    }

    /// Plain transcript: each directive on its own line followed by its output.
    pub fn to_raw_text(&self) -> String {
        let mut text = String::new();
        for command in &self.commands {
            text.push_str(command.directive());
            text.push('\n');
            text.push_str(&command.output_text());
        }
        text
    }

    fn recount_lines(&mut self) {
        self.total_line_count = self.commands.iter().map(|c| c.line_count() as u64).sum();
    }
}
