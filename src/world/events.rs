use crate::rendering::picking::Ray;
use crossbeam_channel::{unbounded, Receiver, Sender};
use glam::{Vec2, Vec3};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

/// Input delivered to subscribed scene components
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    /// A pointer press whose ray hit the lava surface at `hit`
    LavaHit { ndc: Vec2, ray: Ray, hit: Vec3 },
}

#[derive(Default)]
struct HubInner {
    next_id: u64,
    subscribers: Vec<(u64, Sender<InputEvent>)>,
}

/// Fan-out of input events to owned subscriptions
///
/// Subscribers hold a [`Subscription`]; dropping it unregisters the
/// listener, so tearing a component down and setting it up again never
/// leaves a stale listener behind.
#[derive(Clone, Default)]
pub struct InputHub {
    inner: Arc<Mutex<HubInner>>,
}

impl InputHub {
    pub fn new() -> Self {
        InputHub::default()
    }

    fn lock(inner: &Mutex<HubInner>) -> MutexGuard<'_, HubInner> {
        inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = unbounded();
        let mut inner = Self::lock(&self.inner);
        let id = inner.next_id;
        inner.next_id += 1;
        inner.subscribers.push((id, tx));
        Subscription {
            id,
            receiver: rx,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Send `event` to every live subscriber; returns how many received it
    pub fn publish(&self, event: InputEvent) -> usize {
        let mut inner = Self::lock(&self.inner);
        inner.subscribers.retain(|(_, tx)| tx.send(event).is_ok());
        inner.subscribers.len()
    }

    pub fn subscriber_count(&self) -> usize {
        Self::lock(&self.inner).subscribers.len()
    }
}

/// Owned listener registration; unregisters on drop
pub struct Subscription {
    id: u64,
    receiver: Receiver<InputEvent>,
    hub: Weak<Mutex<HubInner>>,
}

impl Subscription {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Events received since the last drain
    pub fn drain(&self) -> Vec<InputEvent> {
        self.receiver.try_iter().collect()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            InputHub::lock(&inner).subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit_event() -> InputEvent {
        InputEvent::LavaHit {
            ndc: Vec2::ZERO,
            ray: Ray::vertical(0.0, 0.0, 10.0),
            hit: Vec3::ZERO,
        }
    }

    #[test]
    fn test_publish_reaches_every_subscriber() {
        let hub = InputHub::new();
        let a = hub.subscribe();
        let b = hub.subscribe();
        assert_eq!(hub.publish(hit_event()), 2);
        assert_eq!(a.drain().len(), 1);
        assert_eq!(b.drain().len(), 1);
        assert!(a.drain().is_empty());
    }

    #[test]
    fn test_drop_unregisters() {
        let hub = InputHub::new();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
        assert_eq!(hub.publish(hit_event()), 0);
    }

    #[test]
    fn test_subscription_outliving_hub_is_harmless() {
        let sub = {
            let hub = InputHub::new();
            hub.subscribe()
        };
        assert!(sub.drain().is_empty());
    }
}
