//! # Transport Subscription
//!
//! Receive side of a transport, uniform over broadcast-backed and
//! channel-backed sources.

use tokio::sync::{broadcast, mpsc};
use tracing::debug;

enum Source {
    Broadcast(broadcast::Receiver<Vec<u8>>),
    Channel(mpsc::Receiver<Vec<u8>>),
}

/// A subscription handle for receiving raw messages.
///
/// When dropped, the subscription is automatically cleaned up.
pub struct Subscription {
    source: Source,

    /// Topic this subscription listens on.
    topic: String,

    /// Bookkeeping run on drop.
    release: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    /// Subscription over a broadcast receiver.
    pub fn from_broadcast(topic: impl Into<String>, receiver: broadcast::Receiver<Vec<u8>>) -> Self {
        Self {
            source: Source::Broadcast(receiver),
            topic: topic.into(),
            release: None,
        }
    }

    /// Subscription over an mpsc receiver fed by a background task.
    pub fn from_channel(topic: impl Into<String>, receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self {
            source: Source::Channel(receiver),
            topic: topic.into(),
            release: None,
        }
    }

    /// Run `release` when this subscription is dropped.
    #[must_use]
    pub fn on_drop(mut self, release: impl FnOnce() + Send + Sync + 'static) -> Self {
        self.release = Some(Box::new(release));
        self
    }

    /// Receive the next message.
    ///
    /// # Returns
    ///
    /// - `Some(bytes)` - The next message
    /// - `None` - The source was closed
    pub async fn recv(&mut self) -> Option<Vec<u8>> {
        match &mut self.source {
            Source::Broadcast(receiver) => loop {
                match receiver.recv().await {
                    Ok(bytes) => return Some(bytes),
                    Err(broadcast::error::RecvError::Closed) => return None,
                    Err(broadcast::error::RecvError::Lagged(count)) => {
                        debug!(topic = %self.topic, lagged = count, "Subscriber lagged, some messages dropped");
                    }
                }
            },
            Source::Channel(receiver) => receiver.recv().await,
        }
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        debug!(topic = %self.topic, "Subscription dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_broadcast_recv_skips_lag() {
        let (tx, rx) = broadcast::channel(2);
        let mut sub = Subscription::from_broadcast("/t", rx);
        for i in 0..4u8 {
            tx.send(vec![i]).unwrap();
        }
        // The two oldest messages were overwritten
        assert_eq!(sub.recv().await, Some(vec![2]));
        assert_eq!(sub.recv().await, Some(vec![3]));
    }

    #[tokio::test]
    async fn test_channel_closes() {
        let (tx, rx) = mpsc::channel(4);
        let mut sub = Subscription::from_channel("/t", rx);
        tx.send(vec![1]).await.unwrap();
        drop(tx);
        assert_eq!(sub.recv().await, Some(vec![1]));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_release_runs_on_drop() {
        let released = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&released);
        let (_tx, rx) = mpsc::channel::<Vec<u8>>(1);
        let sub = Subscription::from_channel("/t", rx).on_drop(move || {
            flag.store(true, Ordering::SeqCst);
        });
        drop(sub);
        assert!(released.load(Ordering::SeqCst));
    }
}
