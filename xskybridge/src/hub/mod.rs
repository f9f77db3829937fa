//! Broadcast hub - fan-out of decoded records to viewer sessions.
//!
//! The hub owns the only concurrently-mutated state in the relay: the set
//! of connected sessions. Callers interact exclusively through [`Hub::join`],
//! [`Hub::leave`] and [`Hub::publish`]; the session collection itself is
//! never exposed.
//!
//! Each session gets a bounded outbound queue. `publish` serializes a
//! record exactly once and attempts a non-blocking send to every session;
//! a full or closed queue tears down that one session without delaying
//! delivery to the others. The hub holds no history - a viewer joining
//! mid-stream only sees records published after it joined.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use crate::telemetry::record::TelemetryRecord;

/// Unique identifier for one viewer session.
pub type SessionId = u64;

/// Default per-session outbound queue depth.
///
/// At tens of records per second this gives a stalled session a couple of
/// seconds of slack before it is considered dead.
pub const DEFAULT_SESSION_QUEUE: usize = 64;

/// Fan-out hub for decoded telemetry records.
pub struct Hub {
    sessions: Mutex<HashMap<SessionId, mpsc::Sender<String>>>,
    next_id: AtomicU64,
    queue_capacity: usize,
}

impl Hub {
    /// Create a hub with the default per-session queue depth.
    pub fn new() -> Self {
        Self::with_queue_capacity(DEFAULT_SESSION_QUEUE)
    }

    /// Create a hub with a custom per-session queue depth.
    pub fn with_queue_capacity(queue_capacity: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            queue_capacity,
        }
    }

    /// Register a new session.
    ///
    /// Returns the session id and the receiving end of its outbound queue.
    /// The gateway task drains the receiver into the viewer's socket;
    /// dropping the receiver is equivalent to the session failing.
    pub fn join(&self) -> (SessionId, mpsc::Receiver<String>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        self.lock().insert(id, tx);
        debug!(session = id, sessions = self.len(), "viewer session joined");
        (id, rx)
    }

    /// Deregister a session. Idempotent: leaving twice is a no-op.
    pub fn leave(&self, id: SessionId) {
        if self.lock().remove(&id).is_some() {
            debug!(session = id, sessions = self.len(), "viewer session left");
        }
    }

    /// Publish one record to every open session.
    ///
    /// The record is serialized once; each session then gets an independent
    /// non-blocking delivery attempt. Sessions whose queue is full or whose
    /// receiver is gone are removed. Unrecognized records are dropped here
    /// as a final safeguard. Returns the number of successful deliveries.
    pub fn publish(&self, record: &TelemetryRecord) -> usize {
        let Some(message) = record.to_message() else {
            trace!("unrecognized record not published");
            return 0;
        };

        // Snapshot the senders so the lock is not held during sends.
        let targets: Vec<(SessionId, mpsc::Sender<String>)> = self
            .lock()
            .iter()
            .map(|(id, tx)| (*id, tx.clone()))
            .collect();

        let mut delivered = 0;
        let mut stale = Vec::new();
        for (id, tx) in targets {
            match tx.try_send(message.clone()) {
                Ok(()) => delivered += 1,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(session = id, "session queue full, dropping session");
                    stale.push(id);
                }
                Err(mpsc::error::TrySendError::Closed(_)) => stale.push(id),
            }
        }
        for id in stale {
            self.leave(id);
        }

        trace!(kind = record.kind(), delivered, "record published");
        delivered
    }

    /// Number of currently-registered sessions.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// True when no viewer is connected.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Drop every session, closing their queues so gateway tasks exit.
    pub fn shutdown(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SessionId, mpsc::Sender<String>>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Hub {
    fn default() -> Self {
        Self::new()
    }
}
