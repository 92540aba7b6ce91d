/**
 * Local Channel Registry
 *
 * In-process map from a user to the bounded queue feeding that user's
 * WebSocket writer. Presence in the registry is the authoritative "connected
 * to this process" signal used by the message router and the redirect
 * endpoint.
 *
 * # Ownership
 *
 * The registry holds the only long-lived sender of each queue. The session
 * keeps just the receiver and the channel id, so once its entry is replaced
 * by a newer connection (or deleted) the receiver drains and closes, which
 * ends the superseded session's writer.
 *
 * # Locking
 *
 * A reader/writer lock guards the map and is held only for the map access
 * itself. Sending happens on a cloned handle outside the lock, so a full
 * queue never blocks other users.
 */

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::shared::{OutboundPush, UserId};

/// Why a push could not be enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ChannelError {
    #[error("local channel is closed")]
    Closed,

    #[error("send cancelled before the queue had room")]
    Cancelled,
}

/// Sending half of a user's local queue.
#[derive(Debug, Clone)]
pub struct LocalChannel {
    id: u64,
    tx: mpsc::Sender<OutboundPush>,
}

impl LocalChannel {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Enqueue `push`, waiting for room until `cancel` fires.
    ///
    /// A closed queue fails immediately.
    pub async fn send(&self, push: OutboundPush, cancel: &CancellationToken) -> Result<(), ChannelError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ChannelError::Cancelled),
            sent = self.tx.send(push) => sent.map_err(|_| ChannelError::Closed),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half handed to the session that serves the user.
#[derive(Debug)]
pub struct LocalChannelReceiver {
    id: u64,
    rx: mpsc::Receiver<OutboundPush>,
}

impl LocalChannelReceiver {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next queued push; `None` once the registry no longer holds the sender.
    pub async fn recv(&mut self) -> Option<OutboundPush> {
        self.rx.recv().await
    }
}

/// Map of locally connected users.
#[derive(Debug)]
pub struct LocalChannelRegistry {
    channels: RwLock<HashMap<UserId, LocalChannel>>,
    capacity: usize,
    next_id: AtomicU64,
}

impl LocalChannelRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
            capacity: capacity.max(1),
            next_id: AtomicU64::new(1),
        }
    }

    /// Install a fresh queue for `user`, replacing any previous one.
    pub fn put(&self, user: UserId) -> LocalChannelReceiver {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.capacity);

        if self
            .channels
            .write()
            .insert(user, LocalChannel { id, tx })
            .is_some()
        {
            tracing::info!(user_id = user, "[Registry] Replaced existing local channel");
        }

        LocalChannelReceiver { id, rx }
    }

    pub fn get(&self, user: UserId) -> Option<LocalChannel> {
        self.channels.read().get(&user).cloned()
    }

    pub fn delete(&self, user: UserId) {
        self.channels.write().remove(&user);
    }

    /// Remove `user`'s entry only if it is still the channel `id`.
    ///
    /// Returns `false` when a newer connection has taken over the entry.
    pub fn release(&self, user: UserId, id: u64) -> bool {
        let mut channels = self.channels.write();
        match channels.get(&user) {
            Some(channel) if channel.id == id => {
                channels.remove(&user);
                true
            }
            _ => false,
        }
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.channels.read().contains_key(&user)
    }

    pub fn len(&self) -> usize {
        self.channels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
