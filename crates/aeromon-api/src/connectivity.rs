//! Shared connectivity state with change notification.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

type Subscriber = Box<dyn Fn(bool) + Send + Sync>;

/// Tracks whether the remote service is currently reachable.
///
/// The flag starts out reachable, flips to unreachable only on a
/// transport-level failure, and flips back on the next successful request.
/// Subscribers are notified once per flip; setting the current value again
/// is a no-op. The flag is advisory UI state, not a correctness gate:
/// last-write-wins across threads is acceptable.
pub struct ConnectivityMonitor {
    reachable: AtomicBool,
    subscribers: Mutex<Vec<Subscriber>>,
}

impl ConnectivityMonitor {
    pub fn new() -> Self {
        Self {
            reachable: AtomicBool::new(true),
            subscribers: Mutex::new(Vec::new()),
        }
    }

    /// Current reachability.
    pub fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst)
    }

    /// Register a callback invoked with the new value on every flip.
    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        self.subscribers
            .lock()
            .expect("connectivity subscriber list poisoned")
            .push(Box::new(callback));
    }

    /// Record a new reachability observation, notifying subscribers on change.
    pub(crate) fn set_reachable(&self, value: bool) {
        let previous = self.reachable.swap(value, Ordering::SeqCst);
        if previous == value {
            return;
        }
        let subscribers = self
            .subscribers
            .lock()
            .expect("connectivity subscriber list poisoned");
        for subscriber in subscribers.iter() {
            subscriber(value);
        }
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectivityMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectivityMonitor")
            .field("reachable", &self.is_reachable())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn starts_reachable() {
        let monitor = ConnectivityMonitor::new();
        assert!(monitor.is_reachable());
    }

    #[test]
    fn notifies_only_on_change() {
        let monitor = ConnectivityMonitor::new();
        let flips = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&flips);
        monitor.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        monitor.set_reachable(true); // no change
        assert_eq!(flips.load(Ordering::SeqCst), 0);

        monitor.set_reachable(false);
        monitor.set_reachable(false); // no change
        monitor.set_reachable(true);
        assert_eq!(flips.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn every_subscriber_sees_the_flip() {
        let monitor = ConnectivityMonitor::new();
        let first = Arc::new(AtomicBool::new(true));
        let second = Arc::new(AtomicBool::new(true));
        for seen in [Arc::clone(&first), Arc::clone(&second)] {
            monitor.subscribe(move |value| seen.store(value, Ordering::SeqCst));
        }

        monitor.set_reachable(false);
        assert!(!first.load(Ordering::SeqCst));
        assert!(!second.load(Ordering::SeqCst));
    }
}
