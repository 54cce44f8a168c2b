//! A single line of command output.

use joblog_protocol::Timestamp;

use super::CommandId;

/// One line of output belonging to a [`Command`](super::Command).
///
/// A line stays open for appends until a newline has been consumed after it.
/// Once complete it is frozen: only the owning command can mutate lines, and it
/// only ever extends the last, incomplete one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogLine {
    number: u64,
    output: String,
    timestamp: Timestamp,
    complete: bool,
    command: CommandId,
}

impl LogLine {
    pub(crate) fn new(number: u64, timestamp: Timestamp, command: CommandId) -> Self {
        Self {
            number,
            output: String::new(),
            timestamp,
            complete: false,
            command,
        }
    }

    /// 1-based line number within the whole job transcript.
    pub fn number(&self) -> u64 {
        self.number
    }

    /// Line text. Never contains `\r` or `\n`.
    pub fn output(&self) -> &str {
        self.output.trim_end_matches('\r')
    }

    /// Timestamp of the last event that touched this line.
    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    /// Whether a newline was seen after this line's text.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    /// Command this line belongs to.
    pub fn command_id(&self) -> CommandId {
        self.command
    }

    /// Append text from an output event and collapse carriage returns.
    pub(crate) fn append(&mut self, text: &str, timestamp: Timestamp) {
        debug_assert!(!self.complete, "append to completed line {}", self.number);
        self.output.push_str(text);
        collapse_carriage_returns(&mut self.output);
        self.timestamp = timestamp;
    }

    /// Close the line. A pending `\r` with nothing after it is dropped.
    pub(crate) fn mark_complete(&mut self) {
        let end = self.output.trim_end_matches('\r').len();
        self.output.truncate(end);
        self.complete = true;
    }
}

/// Emulate terminal overwrite: text after a `\r` replaces everything before
/// it. Trailing `\r`s stay pending until more text arrives on the line, so
/// `ok\r\n` and a final `100%\r` keep their text.
pub fn collapse_carriage_returns(buffer: &mut String) {
    let content_end = buffer.trim_end_matches('\r').len();
    if let Some(pos) = buffer[..content_end].rfind('\r') {
        buffer.drain(..=pos);
    }
}
