//! Job log session
//!
//! Wires one job view: an [`EventsFetcher`] task and a [`RenderLoop`] task
//! that share a single [`EventQueue`]. The two tasks never call each other;
//! the queue is the only hand-off, so fetch cadence and render cadence stay
//! independent.

use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::fetcher::{EventsFetcher, FetchOutcome, FetcherConfig};
use crate::queue::EventQueue;
use crate::render::{RenderConfig, RenderLoop, RenderReport, View};
use crate::transport::EventSource;

/// Error awaiting a session's completion signals
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("fetch task ended without reporting an outcome")]
    FetchAborted,

    #[error("render task failed: {0}")]
    RenderTask(#[from] tokio::task::JoinError),
}

/// Running session for one job view
pub struct JobLogSession<V: View + 'static> {
    queue: EventQueue,
    fetch_task: JoinHandle<FetchOutcome>,
    fetch_finished: oneshot::Receiver<FetchOutcome>,
    render_task: JoinHandle<RenderReport<V>>,
}

impl<V: View + 'static> JobLogSession<V> {
    /// Spawn the fetch and render tasks on the current tokio runtime.
    pub fn start<S>(
        source: Arc<S>,
        view: V,
        fetcher_config: FetcherConfig,
        render_config: RenderConfig,
    ) -> Self
    where
        S: EventSource + ?Sized + 'static,
    {
        let queue = EventQueue::new();
        let (fetcher, fetch_finished) = EventsFetcher::new(source, queue.clone(), fetcher_config);
        let render = RenderLoop::new(queue.clone(), view, render_config);

        tracing::debug!(?fetcher_config, ?render_config, "starting job log session");

        Self {
            queue,
            fetch_task: tokio::spawn(fetcher.run()),
            fetch_finished,
            render_task: tokio::spawn(render.run()),
        }
    }

    /// Handle to the shared queue.
    pub fn queue(&self) -> &EventQueue {
        &self.queue
    }

    /// Leave the view: stop fetching now. Events already queued are still
    /// rendered, then the render task finishes.
    pub fn close(&self) {
        self.fetch_task.abort();
        self.queue.stop();
    }

    /// Wait for both tasks. Resolves with the fetch outcome (`None` if the
    /// session was closed first) and the render report.
    pub async fn wait(self) -> Result<(Option<FetchOutcome>, RenderReport<V>), SessionError> {
        let outcome = self.fetch_finished.await.ok();
        let report = self.render_task.await?;
        Ok((outcome, report))
    }

    /// Split into the two completion signals for hosts that observe them
    /// separately.
    pub fn into_signals(self) -> (FetchFinished, JoinHandle<RenderReport<V>>) {
        (
            FetchFinished {
                receiver: self.fetch_finished,
            },
            self.render_task,
        )
    }
}

/// Resolves once when the fetcher reaches a terminal state
pub struct FetchFinished {
    receiver: oneshot::Receiver<FetchOutcome>,
}

impl FetchFinished {
    pub async fn wait(self) -> Result<FetchOutcome, SessionError> {
        self.receiver.await.map_err(|_| SessionError::FetchAborted)
    }
}
