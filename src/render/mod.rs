//! Render loop
//!
//! Drains the [`EventQueue`], folds events into a [`JobOutput`] and pushes
//! incremental updates to a [`View`]. Each tick touches only what changed:
//! the single command that was still running at the previous tick is
//! re-rendered, and commands that appeared since are rendered once. Finished
//! commands are never rendered again.
//!
//! The loop never waits on the network. When the queue is empty but still
//! running it parks until the fetcher pushes or stops; otherwise it yields to
//! the scheduler between ticks and exits once the queue is stopped and empty.

mod console;
mod transcript;

use std::time::{Duration, Instant};

use chrono::DateTime;
use joblog_protocol::Timestamp;
use tracing::{debug, error, info};

use crate::model::{Applied, Command, CommandError, JobOutput};
use crate::queue::EventQueue;

pub use console::ConsoleView;
pub use transcript::{Fold, RenderedLine, TranscriptView};

/// Rendering target for incremental updates
pub trait View: Send {
    /// Render a command for the first time.
    fn append_command(&mut self, command: &Command);

    /// Replace the rendering of a command that was running at the last tick.
    fn replace_command(&mut self, command: &Command);

    /// Called once after the last tick.
    fn finish(&mut self, _output: &JobOutput) {}
}

/// Render loop settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderConfig {
    /// Maximum events folded per tick. `None` folds everything queued.
    pub batch_limit: Option<usize>,
}

/// Counters collected while rendering
#[derive(Debug, Default)]
pub struct RenderStats {
    pub ticks: u64,
    pub events_folded: u64,
    pub events_ignored: u64,
    /// Events rejected by the model, in arrival order
    pub errors: Vec<CommandError>,
    pub elapsed: Duration,
}

/// Everything the render loop owned, handed back when it finishes
#[derive(Debug)]
pub struct RenderReport<V> {
    pub view: V,
    pub output: JobOutput,
    pub stats: RenderStats,
}

/// What the loop should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// More events are queued; yield and tick again.
    Continue,
    /// Queue is empty but the fetcher is still running; wait for it.
    Idle,
    /// Queue is stopped and drained.
    Done,
}

/// Cooperative consumer of one job's event queue
pub struct RenderLoop<V: View> {
    queue: EventQueue,
    output: JobOutput,
    view: V,
    config: RenderConfig,
    stats: RenderStats,
}

impl<V: View> RenderLoop<V> {
    pub fn new(queue: EventQueue, view: V, config: RenderConfig) -> Self {
        Self {
            queue,
            output: JobOutput::new(),
            view,
            config,
            stats: RenderStats::default(),
        }
    }

    pub fn output(&self) -> &JobOutput {
        &self.output
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn stats(&self) -> &RenderStats {
        &self.stats
    }

    /// Fold whatever is queued (up to the batch limit) and update the view.
    pub fn tick(&mut self) -> TickOutcome {
        self.stats.ticks += 1;

        let events = match self.config.batch_limit {
            Some(limit) => self.queue.take_up_to(limit),
            None => self.queue.drain_all(),
        };

        if !events.is_empty() {
            debug!(events = events.len(), tick = self.stats.ticks, "folding events");

            for event in &events {
                match self.output.apply(event) {
                    Ok(Applied::Changed) => self.stats.events_folded += 1,
                    Ok(Applied::Ignored) => self.stats.events_ignored += 1,
                    Err(e) => {
                        error!(error = %e, event = ?event.kind(), "rejected log event");
                        self.stats.errors.push(e);
                    }
                }
            }

            self.render();
        }

        if self.queue.is_exhausted() {
            TickOutcome::Done
        } else if self.queue.is_empty() {
            TickOutcome::Idle
        } else {
            TickOutcome::Continue
        }
    }

    fn render(&mut self) {
        if let Some(command) = self.output.command_with_rendering_in_progress() {
            self.view.replace_command(command);
        }

        for command in self.output.commands_waiting_to_be_rendered() {
            self.view.append_command(command);
        }

        self.output.mark_all_commands_as_rendered();
    }

    /// Tick until the queue is stopped and drained.
    pub async fn run(mut self) -> RenderReport<V> {
        let started = Instant::now();

        loop {
            match self.tick() {
                TickOutcome::Continue => tokio::task::yield_now().await,
                TickOutcome::Idle => self.queue.changed().await,
                TickOutcome::Done => break,
            }
        }

        self.view.finish(&self.output);
        self.stats.elapsed = started.elapsed();

        info!(
            ticks = self.stats.ticks,
            events = self.stats.events_folded,
            ignored = self.stats.events_ignored,
            errors = self.stats.errors.len(),
            lines = self.output.total_line_count(),
            "job log rendering took {:.3} seconds",
            self.stats.elapsed.as_secs_f64()
        );

        RenderReport {
            view: self.view,
            output: self.output,
            stats: self.stats,
        }
    }
}

/// `mm:ss`, or `h:mm:ss` past an hour.
pub fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let (h, m, s) = (seconds / 3600, (seconds % 3600) / 60, seconds % 60);
    if h > 0 {
        format!("{}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

/// UTC wall-clock time of a server timestamp.
pub fn format_clock(timestamp: Timestamp) -> String {
    DateTime::from_timestamp(timestamp, 0)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}
