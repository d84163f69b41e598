//! Realtime event log streaming.
//!
//! Each session owns one [`EventStreamer`]. The first subscriber starts a
//! background task that repeatedly fetches log chunks from the driver on the
//! blocking pool and fans the lines out to every subscriber. The task stops
//! when the last subscriber goes away and starts again on the next
//! subscribe. Disconnecting the session stops it for good.
//!
//! Fetches are destructive, so at most one is in flight per streamer. A fetch
//! outlives the subscribers that were attached when it started: its lines go
//! to whoever is attached when it returns. Only a disconnect abandons it.
//!
//! ```text
//!                         ┌──────────────┐
//!  Driver::fetch_log ───► │  fetch loop  │ ──try_send──► Subscription 1
//!  (spawn_blocking)       │  (tokio task)│ ──try_send──► Subscription 2
//!                         └──────────────┘ ──try_send──► ...
//! ```
//!
//! Delivery never waits on a subscriber. A subscriber whose channel is full
//! is dropped with [`CloseReason::Lagged`]; everyone else keeps receiving.

use crate::error::SessionError;
use doorgate_core::{Handle, constants::DEFAULT_LOG_CHUNK_BYTES};
use doorgate_driver::{Driver, LogLine, split_chunk};
use futures::Stream;
use serde::Serialize;
use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, trace, warn};

/// Tuning for the fetch loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamerConfig {
    /// Delay between two successful fetches.
    pub poll_interval: Duration,
    /// Ceiling for the delay after consecutive fetch failures.
    pub max_backoff: Duration,
    /// Maximum bytes requested per fetch.
    pub chunk_size: usize,
    /// Lines buffered per subscriber before it counts as lagging.
    pub subscriber_capacity: usize,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            max_backoff: Duration::from_secs(8),
            chunk_size: DEFAULT_LOG_CHUNK_BYTES,
            subscriber_capacity: 256,
        }
    }
}

impl StreamerConfig {
    /// Delay before the fetch following a failure, given the previous delay.
    fn backoff(&self, previous: Option<Duration>) -> Duration {
        match previous {
            None => self.poll_interval,
            Some(d) => (d * 2).min(self.max_backoff.max(self.poll_interval)),
        }
    }
}

/// Lifecycle of a streamer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    /// No subscribers, no fetch loop.
    Idle,
    /// At least one subscriber; the fetch loop is active.
    Running,
    /// The session was disconnected. Terminal.
    Stopped,
}

/// Why a subscription stopped receiving lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// The subscriber went away.
    Detached,
    /// The subscriber fell behind and its buffer filled up.
    Lagged,
    /// The session was disconnected.
    SessionClosed,
}

#[derive(Debug)]
struct Subscriber {
    tx: mpsc::Sender<LogLine>,
    reason: Arc<OnceLock<CloseReason>>,
}

impl Subscriber {
    fn close(self, reason: CloseReason) {
        let _ = self.reason.set(reason);
    }
}

#[derive(Debug)]
struct Inner {
    state: StreamState,
    subscribers: HashMap<u64, Subscriber>,
    cancel: Option<CancellationToken>,
}

struct Shared {
    handle: Handle,
    driver: Arc<dyn Driver>,
    config: StreamerConfig,
    next_id: AtomicU64,
    inner: Mutex<Inner>,
    /// Held from the start of a fetch until its lines are delivered.
    fetch_gate: tokio::sync::Mutex<()>,
    /// Cancelled once, by `stop`.
    stopped: CancellationToken,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn detach(&self, id: u64) {
        let mut inner = self.lock();
        if let Some(sub) = inner.subscribers.remove(&id) {
            sub.close(CloseReason::Detached);
            debug!(handle = %self.handle, id, "Subscriber detached");
        }
        Self::idle_if_empty(&mut inner, self.handle);
    }

    /// Cancel the fetch loop once nobody is listening.
    fn idle_if_empty(inner: &mut Inner, handle: Handle) {
        if inner.state == StreamState::Running && inner.subscribers.is_empty() {
            if let Some(cancel) = inner.cancel.take() {
                cancel.cancel();
            }
            inner.state = StreamState::Idle;
            debug!(handle = %handle, "Event streamer idle");
        }
    }

    /// Fan `lines` out to the subscribers attached right now.
    fn deliver(&self, lines: &[LogLine]) {
        let mut inner = self.lock();
        // Idle: nobody to deliver to. Stopped: subscribers already closed.
        if inner.state != StreamState::Running {
            trace!(handle = %self.handle, lines = lines.len(), "No subscribers, discarding lines");
            return;
        }

        let mut dropped: Vec<(u64, CloseReason)> = Vec::new();
        for line in lines {
            for (id, sub) in &inner.subscribers {
                if dropped.iter().any(|(d, _)| d == id) {
                    continue;
                }
                match sub.tx.try_send(line.clone()) {
                    Ok(()) => trace!(handle = %self.handle, id, "Delivered log line"),
                    Err(TrySendError::Full(_)) => {
                        warn!(handle = %self.handle, id, "Subscriber lagging, dropping it");
                        dropped.push((*id, CloseReason::Lagged));
                    }
                    Err(TrySendError::Closed(_)) => dropped.push((*id, CloseReason::Detached)),
                }
            }
        }

        for (id, reason) in dropped {
            if let Some(sub) = inner.subscribers.remove(&id) {
                sub.close(reason);
            }
        }
        Self::idle_if_empty(&mut inner, self.handle);
    }
}

/// Per-session realtime log fan-out.
pub struct EventStreamer {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EventStreamer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventStreamer")
            .field("handle", &self.shared.handle)
            .field("state", &self.state())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

impl EventStreamer {
    pub fn new(handle: Handle, driver: Arc<dyn Driver>, config: StreamerConfig) -> Self {
        Self {
            shared: Arc::new(Shared {
                handle,
                driver,
                config,
                next_id: AtomicU64::new(1),
                inner: Mutex::new(Inner {
                    state: StreamState::Idle,
                    subscribers: HashMap::new(),
                    cancel: None,
                }),
                fetch_gate: tokio::sync::Mutex::new(()),
                stopped: CancellationToken::new(),
            }),
        }
    }

    pub fn state(&self) -> StreamState {
        self.shared.lock().state
    }

    pub fn subscriber_count(&self) -> usize {
        self.shared.lock().subscribers.len()
    }

    /// Attach a new subscriber, starting the fetch loop if it is idle.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    /// Returns `SessionError::Closed` once the streamer is stopped.
    pub fn subscribe(&self) -> Result<Subscription, SessionError> {
        let shared = &self.shared;
        let mut inner = shared.lock();
        if inner.state == StreamState::Stopped {
            return Err(SessionError::Closed);
        }

        let id = shared.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(shared.config.subscriber_capacity.max(1));
        let reason = Arc::new(OnceLock::new());
        inner.subscribers.insert(
            id,
            Subscriber {
                tx,
                reason: Arc::clone(&reason),
            },
        );

        if inner.state == StreamState::Idle {
            let cancel = CancellationToken::new();
            inner.cancel = Some(cancel.clone());
            inner.state = StreamState::Running;
            tokio::spawn(run(Arc::clone(shared), cancel));
            debug!(handle = %shared.handle, "Event streamer running");
        }
        debug!(handle = %shared.handle, id, "Subscriber attached");

        Ok(Subscription {
            id,
            handle: shared.handle,
            rx,
            reason,
            shared: Arc::clone(shared),
        })
    }

    /// Stop for good, closing every subscription. Idempotent.
    pub fn stop(&self) {
        let mut inner = self.shared.lock();
        if inner.state == StreamState::Stopped {
            return;
        }
        inner.state = StreamState::Stopped;
        self.shared.stopped.cancel();
        if let Some(cancel) = inner.cancel.take() {
            cancel.cancel();
        }
        for (_, sub) in inner.subscribers.drain() {
            sub.close(CloseReason::SessionClosed);
        }
        debug!(handle = %self.shared.handle, "Event streamer stopped");
    }
}

/// Fetch loop of one Running epoch. `epoch` is cancelled when the streamer
/// goes idle or stops.
async fn run(shared: Arc<Shared>, epoch: CancellationToken) {
    let config = shared.config.clone();
    let mut backoff: Option<Duration> = None;

    loop {
        // Waits out a fetch that an earlier epoch still has in flight.
        let gate = tokio::select! {
            biased;
            _ = epoch.cancelled() => break,
            gate = shared.fetch_gate.lock() => gate,
        };

        let driver = Arc::clone(&shared.driver);
        let chunk_size = config.chunk_size;
        let fetch = tokio::task::spawn_blocking(move || driver.fetch_log_chunk(chunk_size));

        // Going idle lets the fetch finish. A stopped session abandons it;
        // the driver's own timeout bounds the blocked thread.
        let result = tokio::select! {
            _ = shared.stopped.cancelled() => break,
            result = fetch => result,
        };

        let delay = match result {
            Ok(Ok(chunk)) => {
                backoff = None;
                if !chunk.is_empty() {
                    let lines = split_chunk(&chunk);
                    trace!(handle = %shared.handle, lines = lines.len(), "Fetched log chunk");
                    shared.deliver(&lines);
                }
                config.poll_interval
            }
            Ok(Err(e)) => {
                let delay = config.backoff(backoff);
                backoff = Some(delay);
                warn!(
                    handle = %shared.handle,
                    error = %e,
                    retry_in_ms = delay.as_millis() as u64,
                    "Realtime log fetch failed"
                );
                delay
            }
            Err(e) => {
                let delay = config.backoff(backoff);
                backoff = Some(delay);
                error!(handle = %shared.handle, error = %e, "Realtime log fetch aborted");
                delay
            }
        };
        drop(gate);

        tokio::select! {
            _ = epoch.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }
    }

    debug!(handle = %shared.handle, "Fetch loop exited");
}

/// An ordered stream of log lines from one session.
///
/// Ends when the session is disconnected or the subscriber is dropped for
/// lagging. Dropping the subscription detaches it immediately.
pub struct Subscription {
    id: u64,
    handle: Handle,
    rx: mpsc::Receiver<LogLine>,
    reason: Arc<OnceLock<CloseReason>>,
    shared: Arc<Shared>,
}

impl Subscription {
    /// Next line, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<LogLine> {
        self.rx.recv().await
    }

    /// Handle of the session this subscription belongs to.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Why the stream ended, if it has.
    pub fn close_reason(&self) -> Option<CloseReason> {
        self.reason.get().copied()
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("handle", &self.handle)
            .field("close_reason", &self.close_reason())
            .finish()
    }
}

impl Stream for Subscription {
    type Item = LogLine;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<LogLine>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.shared.detach(self.id);
    }
}
