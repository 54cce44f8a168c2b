//! In-memory foldable transcript.

use std::collections::HashMap;
use std::fmt::Write;

use crate::model::{Command, CommandId, CommandStatus, LogLine};

use super::{format_duration, View};

/// A rendered output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLine {
    pub number: u64,
    pub text: String,
}

impl From<&LogLine> for RenderedLine {
    fn from(line: &LogLine) -> Self {
        Self {
            number: line.number(),
            text: line.output().to_string(),
        }
    }
}

/// One command's collapsible block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    pub command_id: CommandId,
    pub directive: String,
    pub number: u64,
    pub status: CommandStatus,
    pub exit_code: Option<i32>,
    pub duration_seconds: Option<i64>,
    pub lines: Vec<RenderedLine>,
    pub open: bool,
    /// Set once the reader toggles the fold; status changes no longer
    /// open or close it.
    pub pinned: bool,
    /// Leading lines already rendered complete. They never change again.
    settled_lines: usize,
}

impl Fold {
    fn from_command(command: &Command) -> Self {
        let status = command.status();
        Self {
            command_id: command.id(),
            directive: command.directive().to_string(),
            number: command.starting_line_number(),
            status,
            exit_code: command.exit_code(),
            duration_seconds: command.duration_seconds(),
            lines: command.lines().iter().map(RenderedLine::from).collect(),
            open: opens_by_default(status),
            pinned: false,
            settled_lines: settled(command.lines()),
        }
    }

    /// Bring the fold up to date, re-rendering only lines that were still
    /// open or are new.
    fn refresh(&mut self, command: &Command) {
        self.status = command.status();
        self.exit_code = command.exit_code();
        self.duration_seconds = command.duration_seconds();
        if !self.pinned {
            self.open = opens_by_default(self.status);
        }

        let fresh = command.lines().get(self.settled_lines..).unwrap_or_default();
        self.lines.truncate(self.settled_lines);
        self.lines.extend(fresh.iter().map(RenderedLine::from));
        self.settled_lines += settled(fresh);
    }

    fn header(&self) -> String {
        let marker = if self.open { "▾" } else { "▸" };
        let status = match (self.status, self.exit_code) {
            (CommandStatus::Running, _) => "running".to_string(),
            (CommandStatus::Passed, _) => "passed".to_string(),
            (CommandStatus::Failed, Some(-1)) => "killed".to_string(),
            (CommandStatus::Failed, Some(code)) => format!("failed ({})", code),
            (CommandStatus::Failed, None) => "failed".to_string(),
        };

        match self.duration_seconds {
            Some(seconds) => format!("{} {}  [{}, {}]", marker, self.directive, status, format_duration(seconds)),
            None => format!("{} {}  [{}]", marker, self.directive, status),
        }
    }
}

fn settled(lines: &[LogLine]) -> usize {
    lines.iter().take_while(|l| l.is_complete()).count()
}

/// Running and failed commands stay open; passed ones fold away.
fn opens_by_default(status: CommandStatus) -> bool {
    !matches!(status, CommandStatus::Passed)
}

/// Line-numbered transcript with one fold per command
#[derive(Debug, Default)]
pub struct TranscriptView {
    folds: Vec<Fold>,
    index: HashMap<CommandId, usize>,
    appends: u64,
    replacements: u64,
}

impl TranscriptView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn folds(&self) -> &[Fold] {
        &self.folds
    }

    pub fn fold(&self, id: CommandId) -> Option<&Fold> {
        self.index.get(&id).map(|&i| &self.folds[i])
    }

    /// Number of first-time renders
    pub fn appends(&self) -> u64 {
        self.appends
    }

    /// Number of re-renders of running commands
    pub fn replacements(&self) -> u64 {
        self.replacements
    }

    /// Open or close a fold. Returns false for an unknown command.
    pub fn toggle(&mut self, id: CommandId) -> bool {
        match self.index.get(&id) {
            Some(&i) => {
                let fold = &mut self.folds[i];
                fold.open = !fold.open;
                fold.pinned = true;
                true
            }
            None => false,
        }
    }

    /// Render as text. Closed folds show only their header line.
    pub fn to_text(&self) -> String {
        let width = self
            .folds
            .iter()
            .flat_map(|f| f.lines.last().map(|l| l.number).into_iter().chain(Some(f.number)))
            .max()
            .unwrap_or(1)
            .to_string()
            .len();

        let mut text = String::new();
        for fold in &self.folds {
            let _ = writeln!(text, "{:>width$} {}", fold.number, fold.header(), width = width);
            if fold.open {
                for line in &fold.lines {
                    let _ = writeln!(text, "{:>width$}   {}", line.number, line.text, width = width);
                }
            }
        }
        text
    }
}

impl View for TranscriptView {
    fn append_command(&mut self, command: &Command) {
        self.appends += 1;
        match self.index.get(&command.id()) {
            Some(&i) => self.folds[i].refresh(command),
            None => {
                self.index.insert(command.id(), self.folds.len());
                self.folds.push(Fold::from_command(command));
            }
        }
    }

    fn replace_command(&mut self, command: &Command) {
        self.replacements += 1;
        match self.index.get(&command.id()) {
            Some(&i) => self.folds[i].refresh(command),
            None => {
                self.index.insert(command.id(), self.folds.len());
                self.folds.push(Fold::from_command(command));
            }
        }
    }
}
