//! Synchronous observer lists
//!
//! A [`Channel`] is owned by whoever publishes on it. Subscribers run in the
//! order they subscribed, on the publishing thread, before `publish` returns.
//! Any subscriber may stop the delivery by returning [`Delivery::Cancel`].

/// Whether a published value should keep travelling down the subscriber list
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Delivery {
    /// Hand the value to the next subscriber
    #[default]
    Continue,
    /// Stop here; later subscribers do not see the value
    Cancel,
}

/// Handle returned by [`Channel::subscribe`], used to unsubscribe
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

type Subscriber<T> = Box<dyn FnMut(&T) -> Delivery + Send>;

/// An ordered list of subscribers for values of type `T`
pub struct Channel<T> {
    subscribers: Vec<(SubscriptionId, Subscriber<T>)>,
    next_id: u64,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Channel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Channel")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl<T> Channel<T> {
    /// Create an empty channel
    pub fn new() -> Self {
        Self {
            subscribers: Vec::new(),
            next_id: 0,
        }
    }

    /// Subscribe a callback that sees every value
    pub fn subscribe<F>(&mut self, mut callback: F) -> SubscriptionId
    where
        F: FnMut(&T) + Send + 'static,
    {
        self.subscribe_cancellable(move |value| {
            callback(value);
            Delivery::Continue
        })
    }

    /// Subscribe a callback that may cancel delivery to later subscribers
    pub fn subscribe_cancellable<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&T) -> Delivery + Send + 'static,
    {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Remove a subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(sub, _)| *sub != id);
        self.subscribers.len() != before
    }

    /// Deliver `value` to subscribers in subscription order
    pub fn publish(&mut self, value: &T) -> Delivery {
        for (_, subscriber) in self.subscribers.iter_mut() {
            if subscriber(value) == Delivery::Cancel {
                return Delivery::Cancel;
            }
        }
        Delivery::Continue
    }

    /// Number of subscribers
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// Whether nobody is subscribed
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }

    /// Drop every subscriber
    pub fn clear(&mut self) {
        self.subscribers.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_publish_in_subscription_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut channel = Channel::new();

        for tag in ["first", "second"] {
            let seen = seen.clone();
            channel.subscribe(move |value: &i32| seen.lock().unwrap().push((tag, *value)));
        }

        assert_eq!(channel.publish(&7), Delivery::Continue);
        assert_eq!(*seen.lock().unwrap(), vec![("first", 7), ("second", 7)]);
    }

    #[test]
    fn test_cancel_stops_delivery() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut channel = Channel::new();

        channel.subscribe_cancellable(|value: &i32| {
            if *value < 0 {
                Delivery::Cancel
            } else {
                Delivery::Continue
            }
        });
        let sink = seen.clone();
        channel.subscribe(move |value: &i32| sink.lock().unwrap().push(*value));

        assert_eq!(channel.publish(&-1), Delivery::Cancel);
        assert_eq!(channel.publish(&3), Delivery::Continue);
        assert_eq!(*seen.lock().unwrap(), vec![3]);
    }

    #[test]
    fn test_unsubscribe() {
        let mut channel: Channel<()> = Channel::new();
        let a = channel.subscribe(|_| {});
        let _b = channel.subscribe(|_| {});

        assert!(channel.unsubscribe(a));
        assert!(!channel.unsubscribe(a));
        assert_eq!(channel.len(), 1);

        channel.clear();
        assert!(channel.is_empty());
    }
}
