//! # Change Signal
//!
//! A replay-latest invalidation primitive. Publishers call
//! [`ChangeSignal::notify`]; every live subscription wakes once per burst of
//! notifications (intermediate versions are conflated) and re-reads whatever
//! state it depends on.
//!
//! Subscribe *before* reading the state you want to keep fresh: a
//! notification that lands between the read and the first wait is then still
//! observed.
//!
//! ```rust
//! use core_runtime::signal::ChangeSignal;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let signal = ChangeSignal::new();
//! let mut subscription = signal.subscribe();
//!
//! signal.notify();
//! signal.notify();
//! assert!(subscription.changed().await);
//! assert_eq!(subscription.version(), 2);
//! # }
//! ```

use futures::stream::{self, BoxStream, StreamExt};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

/// Shared, cloneable publisher side.
#[derive(Clone)]
pub struct ChangeSignal {
    sender: Arc<watch::Sender<u64>>,
}

impl ChangeSignal {
    pub fn new() -> Self {
        let (sender, _) = watch::channel(0);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Bump the version and wake every subscriber.
    pub fn notify(&self) {
        self.sender.send_modify(|version| *version = version.wrapping_add(1));
    }

    /// Number of notifications published so far.
    pub fn version(&self) -> u64 {
        *self.sender.borrow()
    }

    /// A subscription that considers the current version already seen.
    pub fn subscribe(&self) -> ChangeSubscription {
        ChangeSubscription {
            receiver: self.sender.subscribe(),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChangeSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ChangeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeSignal")
            .field("version", &self.version())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Receiving side of a [`ChangeSignal`].
pub struct ChangeSubscription {
    receiver: watch::Receiver<u64>,
}

impl ChangeSubscription {
    /// Wait for the next unseen notification.
    ///
    /// Returns `false` once the signal has been dropped and no further
    /// notifications can arrive.
    pub async fn changed(&mut self) -> bool {
        self.receiver.changed().await.is_ok()
    }

    /// Latest version, marking it seen.
    pub fn version(&mut self) -> u64 {
        *self.receiver.borrow_and_update()
    }

    /// Stream that yields once per observed notification burst.
    pub fn into_stream(self) -> BoxStream<'static, u64> {
        stream::unfold(self, |mut subscription| async move {
            if subscription.changed().await {
                let version = subscription.version();
                Some((version, subscription))
            } else {
                None
            }
        })
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn test_notify_wakes_subscriber() {
        let signal = ChangeSignal::new();
        let mut subscription = signal.subscribe();

        let publisher = signal.clone();
        tokio::spawn(async move { publisher.notify() });

        assert!(subscription.changed().await);
        assert_eq!(subscription.version(), 1);
    }

    #[tokio::test]
    async fn test_subscription_starts_with_current_version_seen() {
        let signal = ChangeSignal::new();
        signal.notify();

        let mut subscription = signal.subscribe();
        let waited = timeout(Duration::from_millis(50), subscription.changed()).await;
        assert!(waited.is_err(), "no notification after subscribing");
    }

    #[tokio::test]
    async fn test_bursts_are_conflated() {
        let signal = ChangeSignal::new();
        let mut subscription = signal.subscribe();

        for _ in 0..5 {
            signal.notify();
        }

        assert!(subscription.changed().await);
        assert_eq!(subscription.version(), 5);
        let again = timeout(Duration::from_millis(50), subscription.changed()).await;
        assert!(again.is_err());
    }

    #[tokio::test]
    async fn test_dropped_signal_ends_subscription() {
        let signal = ChangeSignal::new();
        let subscription = signal.subscribe();
        drop(signal);

        let versions: Vec<u64> = subscription.into_stream().collect().await;
        assert!(versions.is_empty());
    }

    #[tokio::test]
    async fn test_notify_without_subscribers_is_recorded() {
        let signal = ChangeSignal::new();
        signal.notify();
        assert_eq!(signal.version(), 1);
        assert_eq!(signal.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_stream_yields_latest_version() {
        let signal = ChangeSignal::new();
        let mut stream = signal.subscribe().into_stream();

        signal.notify();
        assert_eq!(stream.next().await, Some(1));
        signal.notify();
        signal.notify();
        assert_eq!(stream.next().await, Some(3));
    }
}
