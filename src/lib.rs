//! Job Log Viewer
//!
//! Turns the event stream of a CI job into a foldable, line-numbered
//! transcript while the job is still running. A fetcher polls the events
//! endpoint into a queue; a render loop folds queued events into commands and
//! lines and pushes incremental updates to a view.

pub mod config;
pub mod fetcher;
pub mod model;
pub mod queue;
pub mod render;
pub mod replay;
pub mod session;
pub mod transport;

pub use config::{ConfigError, LoadedConfig, ViewerConfig};
pub use fetcher::{EventsFetcher, FetchOutcome, FetchState, FetcherConfig};
pub use joblog_protocol::{Cursor, Event, EventsPage, JobResult};
pub use model::{Command, CommandError, CommandStatus, JobOutput, LogLine, RenderingState};
pub use queue::EventQueue;
pub use render::{ConsoleView, RenderConfig, RenderLoop, RenderReport, TranscriptView, View};
pub use session::{JobLogSession, SessionError};
pub use transport::{EventSource, HttpEventSource, MockEventSource, TransportError};
