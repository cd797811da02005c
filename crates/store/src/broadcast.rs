//! Single-slot multicast of state snapshots.
//!
//! A [`Broadcaster`] remembers the last value it published. A new
//! [`Subscription`] receives that value first and then every later value, in
//! publication order. Each subscriber has its own unbounded queue so
//! publishing never blocks the worker thread, and values are received on
//! whatever async task awaits [`Subscription::recv`].

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TryRecvError;

struct Slot<T> {
    latest: Option<T>,
    next_id: u64,
    subscribers: Vec<(u64, mpsc::UnboundedSender<T>)>,
}

/// Latest-value multicast notifier.
pub struct Broadcaster<T> {
    slot: Arc<Mutex<Slot<T>>>,
}

impl<T> Clone for Broadcaster<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone> Default for Broadcaster<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Broadcaster<T> {
    pub fn new() -> Self {
        Self {
            slot: Arc::new(Mutex::new(Slot {
                latest: None,
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Replace the latest value and deliver it to every subscriber.
    pub fn publish(&self, value: T) {
        let mut slot = lock(&self.slot);
        slot.subscribers
            .retain(|(_, tx)| tx.send(value.clone()).is_ok());
        slot.latest = Some(value);
    }

    /// Subscribe, receiving the latest value (if any) before later ones.
    pub fn subscribe(&self) -> Subscription<T> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut slot = lock(&self.slot);

        if let Some(latest) = &slot.latest {
            // The receiver is alive, so this cannot fail.
            let _ = tx.send(latest.clone());
        }

        let id = slot.next_id;
        slot.next_id += 1;
        slot.subscribers.push((id, tx));

        Subscription {
            id,
            rx,
            slot: Arc::clone(&self.slot),
            active: true,
        }
    }

    /// The most recently published value.
    pub fn latest(&self) -> Option<T> {
        lock(&self.slot).latest.clone()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.slot).subscribers.len()
    }
}

fn lock<T>(slot: &Mutex<Slot<T>>) -> MutexGuard<'_, Slot<T>> {
    slot.lock().unwrap_or_else(|e| e.into_inner())
}

/// Receiving end of a [`Broadcaster`].
///
/// Dropping the subscription unsubscribes it.
pub struct Subscription<T> {
    id: u64,
    rx: mpsc::UnboundedReceiver<T>,
    slot: Arc<Mutex<Slot<T>>>,
    active: bool,
}

impl<T> Subscription<T> {
    /// Wait for the next value. Returns `None` once unsubscribed and drained.
    pub async fn recv(&mut self) -> Option<T> {
        self.rx.recv().await
    }

    /// Take the next value if one is already queued.
    pub fn try_recv(&mut self) -> Option<T> {
        match self.rx.try_recv() {
            Ok(value) => Some(value),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Stop delivery. Values already queued can still be drained.
    ///
    /// Calling this more than once has no further effect.
    pub fn unsubscribe(&mut self) {
        if !self.active {
            return;
        }
        self.active = false;
        lock(&self.slot).subscribers.retain(|(id, _)| *id != self.id);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_subscriber_gets_latest_then_updates() {
        let broadcaster = Broadcaster::new();
        broadcaster.publish(1);
        broadcaster.publish(2);

        let mut sub = broadcaster.subscribe();
        broadcaster.publish(3);
        broadcaster.publish(4);

        assert_eq!(sub.recv().await, Some(2));
        assert_eq!(sub.recv().await, Some(3));
        assert_eq!(sub.recv().await, Some(4));
        assert_eq!(sub.try_recv(), None);
    }

    #[tokio::test]
    async fn test_subscribe_before_first_publish() {
        let broadcaster = Broadcaster::<&str>::new();
        let mut sub = broadcaster.subscribe();
        assert_eq!(sub.try_recv(), None);

        broadcaster.publish("first");
        assert_eq!(sub.recv().await, Some("first"));
        assert_eq!(broadcaster.latest(), Some("first"));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent_and_isolated() {
        let broadcaster = Broadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        a.unsubscribe();
        a.unsubscribe();
        assert!(!a.is_active());
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.publish(7);
        assert_eq!(a.recv().await, None);
        assert_eq!(b.recv().await, Some(7));
    }

    #[tokio::test]
    async fn test_dropped_subscription_is_removed() {
        let broadcaster = Broadcaster::new();
        let sub = broadcaster.subscribe();
        drop(sub);
        assert_eq!(broadcaster.subscriber_count(), 0);
        broadcaster.publish(1);
        assert_eq!(broadcaster.latest(), Some(1));
    }

    #[tokio::test]
    async fn test_publish_from_other_thread_keeps_order() {
        let broadcaster = Broadcaster::new();
        let mut sub = broadcaster.subscribe();

        let publisher = broadcaster.clone();
        std::thread::spawn(move || {
            for i in 0..50 {
                publisher.publish(i);
            }
        })
        .join()
        .unwrap();

        for i in 0..50 {
            assert_eq!(sub.recv().await, Some(i));
        }
    }
}
