//! Job Log Protocol Types
//!
//! Defines the JSON shapes served by the job log events endpoint:
//! individual log events and the cursor-paged response that carries them.

pub mod cursor;
pub mod error;
pub mod event;
pub mod page;

pub use cursor::Cursor;
pub use error::DecodeError;
pub use event::{Event, JobResult, Timestamp};
pub use page::EventsPage;

/// Query parameter carrying the cursor on every events request.
pub const CURSOR_QUERY_PARAM: &str = "token";

/// Known `event` tag values.
pub mod names {
    pub const CMD_STARTED: &str = "cmd_started";
    pub const CMD_OUTPUT: &str = "cmd_output";
    pub const CMD_FINISHED: &str = "cmd_finished";
    pub const JOB_FINISHED: &str = "job_finished";
}
