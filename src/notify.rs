//! Rotation notifications
//!
//! In-process publish/subscribe registry. Every subscriber owns a small
//! bounded channel; publishing never blocks, so a subscriber that is not
//! receiving simply misses the event. Followers re-open the active path when
//! notified and do not depend on the event carrying any data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crossbeam::channel::{
    self, Receiver, RecvError, RecvTimeoutError, Sender, TryRecvError, TrySendError,
};
use parking_lot::Mutex;
use tracing::{debug, trace};

/// "The active file was rotated"
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RotationEvent;

/// Identifies one subscription within a notifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

/// Receiving end handed out by [`RotationNotifier::subscribe`]
#[derive(Debug)]
pub struct Subscription {
    id: SubscriberId,
    receiver: Receiver<RotationEvent>,
}

impl Subscription {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// The underlying channel, e.g. for `crossbeam::select!`
    pub fn receiver(&self) -> &Receiver<RotationEvent> {
        &self.receiver
    }

    /// Block until the next event; fails once unsubscribed (or the writer is
    /// dropped) and nothing is buffered
    pub fn recv(&self) -> Result<RotationEvent, RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<RotationEvent, TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<RotationEvent, RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Fan-out of rotation events to any number of subscribers
///
/// ## Concurrency:
/// - `subscribers`: guarded by a Mutex, so subscribe/unsubscribe never race
///   with a publish in progress
/// - `next_id`: atomic counter (lock-free)
#[derive(Debug)]
pub struct RotationNotifier {
    /// Per-subscriber channel capacity (0 = deliver only to a blocked receiver)
    buffer: usize,
    next_id: AtomicU64,
    subscribers: Mutex<Vec<(SubscriberId, Sender<RotationEvent>)>>,
}

impl Default for RotationNotifier {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BUFFER)
    }
}

impl RotationNotifier {
    /// One pending event is enough: followers only need to know "at least one rotation happened"
    pub const DEFAULT_BUFFER: usize = 1;

    pub fn new(buffer: usize) -> Self {
        Self {
            buffer,
            next_id: AtomicU64::new(1),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Register a new subscriber
    pub fn subscribe(&self) -> Subscription {
        let id = SubscriberId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = channel::bounded(self.buffer);
        self.subscribers.lock().push((id, sender));
        debug!(subscriber = id.0, "rotation subscriber added");
        Subscription { id, receiver }
    }

    /// Stop delivering to `id`. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriberId) -> bool {
        let mut subscribers = self.subscribers.lock();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!(subscriber = id.0, "rotation subscriber removed");
        }
        removed
    }

    /// Deliver one event to every subscriber without blocking.
    ///
    /// Returns how many subscribers accepted it. Subscribers whose buffer is
    /// full miss this event; subscribers whose receiver was dropped are removed.
    pub fn publish(&self) -> usize {
        let mut subscribers = self.subscribers.lock();
        let mut delivered = 0;

        subscribers.retain(|(id, sender)| match sender.try_send(RotationEvent) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                trace!(subscriber = id.0, "subscriber busy, rotation event dropped");
                true
            }
            Err(TrySendError::Disconnected(_)) => {
                debug!(subscriber = id.0, "subscriber gone, removing");
                false
            }
        });

        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
