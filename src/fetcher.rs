//! Events fetcher
//!
//! Polls the events endpoint with a server-issued cursor and feeds the
//! [`EventQueue`]. One request is in flight at a time, so events reach the
//! queue in server order.
//!
//! State machine:
//! `Idle → Fetching → (success → Idle | Finished) | (error → Idle via back-off | Failed)`
//!
//! Pacing:
//! - non-empty page: next request after the regular interval
//! - empty page: next request after the back-off interval
//! - transport error: retry after the back-off interval, until
//!   `max_consecutive_errors` errors in a row, which is fatal
//!
//! Reaching `Finished` or `Failed` stops the queue and resolves the
//! completion receiver exactly once.

use std::sync::Arc;
use std::time::Duration;

use joblog_protocol::Cursor;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::queue::EventQueue;
use crate::transport::EventSource;

/// Fetcher pacing and retry limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetcherConfig {
    /// Consecutive transport errors tolerated before giving up (>= 1)
    pub max_consecutive_errors: u32,
    /// Delay after an empty page or a transport error
    pub back_off_interval: Duration,
    /// Delay after a page that carried events
    pub regular_interval: Duration,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 7,
            back_off_interval: Duration::from_millis(5000),
            regular_interval: Duration::from_millis(200),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
    Finished,
    Failed,
}

/// How the fetch loop ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The server signalled end of stream.
    Finished,
    /// Retries were exhausted. `message` is meant for the user.
    Failed { message: String },
    /// The queue was stopped by its owner before the stream ended.
    Cancelled,
}

/// What the caller should do after a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStep {
    /// Fetch again after the given delay.
    Continue(Duration),
    /// The fetch loop is over.
    Done(FetchOutcome),
}

/// Cursor-driven poller for one job's events
pub struct EventsFetcher<S: EventSource + ?Sized> {
    source: Arc<S>,
    queue: EventQueue,
    config: FetcherConfig,
    state: FetchState,
    cursor: Cursor,
    consecutive_errors: u32,
    outcome: Option<FetchOutcome>,
    on_complete: Option<oneshot::Sender<FetchOutcome>>,
    requests: u64,
    events_fetched: u64,
}

impl<S: EventSource + ?Sized> EventsFetcher<S> {
    /// Create a fetcher starting at the initial cursor, together with the
    /// receiver that resolves when it reaches a terminal state.
    pub fn new(
        source: Arc<S>,
        queue: EventQueue,
        config: FetcherConfig,
    ) -> (Self, oneshot::Receiver<FetchOutcome>) {
        let (tx, rx) = oneshot::channel();
        let fetcher = Self {
            source,
            queue,
            config,
            state: FetchState::Idle,
            cursor: Cursor::initial(),
            consecutive_errors: 0,
            outcome: None,
            on_complete: Some(tx),
            requests: 0,
            events_fetched: 0,
        };
        (fetcher, rx)
    }

    pub fn state(&self) -> FetchState {
        self.state
    }

    pub fn cursor(&self) -> &Cursor {
        &self.cursor
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// User-facing message once the fetcher has failed.
    pub fn failure_message(&self) -> Option<&str> {
        match self.outcome {
            Some(FetchOutcome::Failed { ref message }) => Some(message),
            _ => None,
        }
    }

    pub fn requests(&self) -> u64 {
        self.requests
    }

    /// Issue one request and process its result.
    pub async fn tick(&mut self) -> FetchStep {
        if let Some(ref outcome) = self.outcome {
            return FetchStep::Done(outcome.clone());
        }

        if !self.queue.is_running() {
            return self.cancel();
        }

        self.state = FetchState::Fetching;
        self.requests += 1;
        debug!(cursor = %self.cursor, request = self.requests, "fetching events");

        match self.source.fetch(&self.cursor).await {
            Ok(page) => {
                self.consecutive_errors = 0;

                let count = page.events.len();
                self.events_fetched += count as u64;
                self.queue.push_all(page.events);

                match page.next {
                    None => {
                        info!(
                            events = self.events_fetched,
                            requests = self.requests,
                            "event stream finished"
                        );
                        self.complete(FetchState::Finished, FetchOutcome::Finished)
                    }
                    Some(next) => {
                        debug!(events = count, next = %next, "fetched events");
                        self.cursor = next;
                        self.state = FetchState::Idle;
                        if count > 0 {
                            FetchStep::Continue(self.config.regular_interval)
                        } else {
                            FetchStep::Continue(self.config.back_off_interval)
                        }
                    }
                }
            }
            Err(e) => {
                self.consecutive_errors += 1;

                if self.consecutive_errors < self.config.max_consecutive_errors {
                    warn!(
                        error = %e,
                        attempt = self.consecutive_errors,
                        max = self.config.max_consecutive_errors,
                        "fetching events failed, backing off"
                    );
                    self.state = FetchState::Idle;
                    FetchStep::Continue(self.config.back_off_interval)
                } else {
                    let message = format!(
                        "Failed to fetch job logs after {} consecutive attempts ({}). \
                         Reload the page to try again.",
                        self.consecutive_errors, e
                    );
                    warn!(error = %e, "giving up on fetching events");
                    self.complete(FetchState::Failed, FetchOutcome::Failed { message })
                }
            }
        }
    }

    /// Tick until a terminal state, sleeping between requests.
    ///
    /// Stopping the queue cuts short both the sleep and a request in flight;
    /// the fetcher then finishes as cancelled.
    pub async fn run(mut self) -> FetchOutcome {
        let queue = self.queue.clone();
        loop {
            let step = tokio::select! {
                step = self.tick() => Some(step),
                _ = queue.stopped() => None,
            };

            match step.unwrap_or_else(|| self.cancel()) {
                FetchStep::Continue(delay) => {
                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = queue.stopped() => {}
                    }
                }
                FetchStep::Done(outcome) => return outcome,
            }
        }
    }

    fn cancel(&mut self) -> FetchStep {
        if let Some(ref outcome) = self.outcome {
            return FetchStep::Done(outcome.clone());
        }
        info!(cursor = %self.cursor, "event queue closed, stopping fetcher");
        self.complete(FetchState::Finished, FetchOutcome::Cancelled)
    }

    fn complete(&mut self, state: FetchState, outcome: FetchOutcome) -> FetchStep {
        self.state = state;
        self.outcome = Some(outcome.clone());
        self.queue.stop();

        if let Some(tx) = self.on_complete.take() {
            // The receiver may have been dropped by a host that does not care.
            let _ = tx.send(outcome.clone());
        }

        FetchStep::Done(outcome)
    }
}
