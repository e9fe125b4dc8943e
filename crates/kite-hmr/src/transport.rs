//! Fan-out of update messages to connected clients.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap as HashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use crate::payload::HmrPayload;

/// Identifier assigned to a client on connect.
pub type ClientId = usize;

/// Queue depth per client before messages to it are dropped.
pub const DEFAULT_CLIENT_BUFFER: usize = 64;

/// Per-broadcast delivery counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    /// Clients whose queue was full.
    pub skipped: usize,
    /// Clients that had gone away; they are dropped from the set.
    pub closed: usize,
}

/// The live client channels.
///
/// Each client is an mpsc sender feeding its socket task. Sending never
/// waits: a client that cannot take a message right now misses it.
#[derive(Debug, Clone)]
pub struct ConnectionSet {
    clients: Arc<RwLock<HashMap<ClientId, mpsc::Sender<Arc<str>>>>>,
    next_id: Arc<AtomicUsize>,
    buffer: usize,
}

impl Default for ConnectionSet {
    fn default() -> Self {
        Self::with_buffer(DEFAULT_CLIENT_BUFFER)
    }
}

impl ConnectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer(buffer: usize) -> Self {
        Self {
            clients: Arc::new(RwLock::new(HashMap::default())),
            next_id: Arc::new(AtomicUsize::new(0)),
            buffer: buffer.max(1),
        }
    }

    /// Add a client and return the receiving end of its queue.
    pub fn register(&self) -> (ClientId, mpsc::Receiver<Arc<str>>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.buffer);
        self.clients.write().insert(id, tx);
        debug!(client = id, "client connected");
        (id, rx)
    }

    pub fn unregister(&self, id: ClientId) -> bool {
        let removed = self.clients.write().remove(&id).is_some();
        if removed {
            debug!(client = id, "client disconnected");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.clients.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.read().is_empty()
    }

    /// Serialize once and offer the message to every client.
    pub fn broadcast(&self, payload: &HmrPayload) -> BroadcastReport {
        match payload.to_json() {
            Ok(json) => self.broadcast_text(Arc::from(json)),
            Err(err) => {
                warn!(error = %err, "failed to serialize hmr payload");
                BroadcastReport::default()
            }
        }
    }

    pub fn broadcast_text(&self, text: Arc<str>) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        let mut closed = Vec::new();

        {
            let clients = self.clients.read();
            for (id, tx) in clients.iter() {
                match tx.try_send(Arc::clone(&text)) {
                    Ok(()) => report.delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        debug!(client = id, "client queue full, skipping");
                        report.skipped += 1;
                    }
                    Err(TrySendError::Closed(_)) => closed.push(*id),
                }
            }
        }

        if !closed.is_empty() {
            let mut clients = self.clients.write();
            for id in &closed {
                clients.remove(id);
            }
        }
        report.closed = closed.len();
        report
    }
}
