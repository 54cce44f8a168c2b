//! Event queue between the fetcher and the render loop
//!
//! A FIFO of decoded events plus a one-way `running` flag. Handles are cheap
//! clones of the same queue; the fetcher pushes and eventually stops it, the
//! render loop takes from the head. Nothing is ever dropped except by a take.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use joblog_protocol::Event;
use tokio::sync::Notify;

#[derive(Debug)]
struct QueueState {
    buffer: VecDeque<Event>,
    running: bool,
}

#[derive(Debug)]
struct Shared {
    state: Mutex<QueueState>,
    wakeup: Notify,
    stopped: Notify,
}

/// Shared handle to one job view's event queue
#[derive(Debug, Clone)]
pub struct EventQueue {
    shared: Arc<Shared>,
}

impl EventQueue {
    /// Create an empty, running queue.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState {
                    buffer: VecDeque::new(),
                    running: true,
                }),
                wakeup: Notify::new(),
                stopped: Notify::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one event at the tail.
    pub fn push(&self, event: Event) {
        self.state().buffer.push_back(event);
        self.shared.wakeup.notify_one();
    }

    /// Append a batch at the tail, preserving its order.
    pub fn push_all(&self, events: impl IntoIterator<Item = Event>) {
        let added = {
            let mut state = self.state();
            let before = state.buffer.len();
            state.buffer.extend(events);
            state.buffer.len() - before
        };
        if added > 0 {
            self.shared.wakeup.notify_one();
        }
    }

    /// Remove and return up to `n` events from the head.
    pub fn take_up_to(&self, n: usize) -> Vec<Event> {
        let mut state = self.state();
        let count = n.min(state.buffer.len());
        state.buffer.drain(..count).collect()
    }

    /// Remove and return every queued event.
    pub fn drain_all(&self) -> Vec<Event> {
        self.state().buffer.drain(..).collect()
    }

    /// Mark the queue as stopped: no more events will be pushed.
    /// Idempotent and irreversible.
    pub fn stop(&self) {
        self.state().running = false;
        self.shared.wakeup.notify_one();
        self.shared.stopped.notify_waiters();
    }

    pub fn is_running(&self) -> bool {
        self.state().running
    }

    pub fn is_empty(&self) -> bool {
        self.state().buffer.is_empty()
    }

    pub fn len(&self) -> usize {
        self.state().buffer.len()
    }

    /// Stopped and fully drained: the consumer is done.
    pub fn is_exhausted(&self) -> bool {
        let state = self.state();
        !state.running && state.buffer.is_empty()
    }

    /// Wait until something is pushed or the queue is stopped.
    ///
    /// A push or stop that happened since the last wait completes this
    /// immediately, so the check-then-wait sequence in a consumer cannot
    /// miss a wakeup.
    pub async fn changed(&self) {
        self.shared.wakeup.notified().await;
    }

    /// Wait until the queue is stopped. Any number of producers may wait;
    /// none of them consumes the consumer's wakeup.
    pub async fn stopped(&self) {
        let notified = self.shared.stopped.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if !self.is_running() {
            return;
        }
        notified.await;
    }
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}
