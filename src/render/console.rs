//! Incremental console output.
//!
//! A terminal cannot rewrite what it already printed, so instead of replacing
//! a running command's rendering this view prints each line once, as soon as
//! it is complete, and a footer when the command finishes.

use std::collections::HashMap;
use std::io::{self, Write};

use joblog_protocol::JobResult;

use crate::model::{Command, CommandId, JobOutput};

use super::{format_clock, format_duration, View};

#[derive(Debug, Default, Clone, Copy)]
struct Progress {
    printed_lines: usize,
    footer_printed: bool,
}

/// Streams a job transcript to a writer
pub struct ConsoleView<W: Write + Send> {
    writer: W,
    progress: HashMap<CommandId, Progress>,
    line_numbers: bool,
    write_error: Option<io::Error>,
}

impl<W: Write + Send> ConsoleView<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            progress: HashMap::new(),
            line_numbers: false,
            write_error: None,
        }
    }

    /// Prefix each output line with its transcript line number.
    pub fn with_line_numbers(mut self, enabled: bool) -> Self {
        self.line_numbers = enabled;
        self
    }

    /// First write error, if any. Output stops after it.
    pub fn write_error(&self) -> Option<&io::Error> {
        self.write_error.as_ref()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, text: std::fmt::Arguments<'_>) {
        if self.write_error.is_some() {
            return;
        }
        if let Err(e) = self.writer.write_fmt(text).and_then(|_| self.writer.flush()) {
            tracing::warn!(error = %e, "console output failed, further output is dropped");
            self.write_error = Some(e);
        }
    }

    fn emit_progress(&mut self, command: &Command) {
        let mut progress = self.progress.get(&command.id()).copied().unwrap_or_default();

        for line in &command.lines()[progress.printed_lines..] {
            if !line.is_complete() && !command.is_finished() {
                break;
            }
            if self.line_numbers {
                self.emit(format_args!("{:>6}  {}\n", line.number(), line.output()));
            } else {
                self.emit(format_args!("{}\n", line.output()));
            }
            progress.printed_lines += 1;
        }

        if command.is_finished() && !progress.footer_printed {
            let duration = command
                .duration_seconds()
                .map(|s| format!(" in {}", format_duration(s)))
                .unwrap_or_default();
            match command.exit_code() {
                Some(-1) => self.emit(format_args!("<<< killed{}\n", duration)),
                Some(0) => self.emit(format_args!("<<< passed{}\n", duration)),
                Some(code) => self.emit(format_args!("<<< exit code {}{}\n", code, duration)),
                None => {}
            }
            progress.footer_printed = true;
        }

        self.progress.insert(command.id(), progress);
    }
}

impl<W: Write + Send> View for ConsoleView<W> {
    fn append_command(&mut self, command: &Command) {
        let clock = command.started_at().map(format_clock).unwrap_or_default();
        self.emit(format_args!(">>> {} {}\n", clock, command.directive()));
        self.emit_progress(command);
    }

    fn replace_command(&mut self, command: &Command) {
        self.emit_progress(command);
    }

    fn finish(&mut self, output: &JobOutput) {
        let result = match output.result() {
            Some(JobResult::Passed) => "passed",
            Some(JobResult::Failed) => "failed",
            Some(JobResult::Stopped) => "stopped",
            Some(JobResult::Canceled) => "canceled",
            Some(JobResult::Unknown) => "finished",
            None => return,
        };
        let clock = output.finished_at().map(format_clock).unwrap_or_default();
        self.emit(format_args!(
            "=== job {} at {} ({} lines)\n",
            result,
            clock,
            output.total_line_count()
        ));
    }
}
