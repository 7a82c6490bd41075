// src/fanout.rs
use crate::event::SettledUpdate;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::debug;

/// Per-subscriber buffer depth.
///
/// Delivery is lossy on purpose: a subscriber holds at most one pending
/// update and a newer update overwrites it, so a slow viewer only learns that
/// at least one change happened. Publishing never waits on a subscriber.
const SLOT_DEPTH: usize = 1;

/// Fan-out of [`SettledUpdate`] signals to every connected viewer.
#[derive(Clone, Debug)]
pub struct UpdateFanout {
    tx: broadcast::Sender<SettledUpdate>,
}

impl Default for UpdateFanout {
    fn default() -> Self {
        Self::new()
    }
}

impl UpdateFanout {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(SLOT_DEPTH);
        Self { tx }
    }

    /// Registers a new subscriber. It sees updates published from now on.
    pub fn subscribe(&self) -> UpdateSubscription {
        UpdateSubscription {
            rx: self.tx.subscribe(),
        }
    }

    /// Announces a settled update to current subscribers and returns how many
    /// there were. Never blocks.
    pub fn publish(&self) -> usize {
        match self.tx.send(SettledUpdate) {
            Ok(n) => n,
            Err(_) => {
                debug!("No viewers subscribed, update not delivered");
                0
            }
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

/// One viewer's handle into the fan-out. Dropping it unsubscribes.
#[derive(Debug)]
pub struct UpdateSubscription {
    rx: broadcast::Receiver<SettledUpdate>,
}

impl UpdateSubscription {
    /// Waits for the next update. Returns `None` once the fan-out is gone.
    pub async fn next(&mut self) -> Option<SettledUpdate> {
        loop {
            match self.rx.recv().await {
                Ok(update) => return Some(update),
                // The newest update is still buffered; the next recv yields it.
                Err(RecvError::Lagged(missed)) => {
                    debug!("Viewer lagged, collapsed {} updates", missed);
                    continue;
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::timeout;

    #[tokio::test]
    async fn lagging_subscriber_sees_one_update() {
        let fanout = UpdateFanout::new();
        let mut sub = fanout.subscribe();
        for _ in 0..5 {
            assert_eq!(fanout.publish(), 1);
        }
        assert_eq!(sub.next().await, Some(SettledUpdate));
        assert!(timeout(Duration::from_millis(50), sub.next()).await.is_err());
    }

    #[tokio::test]
    async fn late_subscriber_gets_next_update() {
        let fanout = UpdateFanout::new();
        fanout.publish();
        let mut sub = fanout.subscribe();
        assert!(timeout(Duration::from_millis(50), sub.next()).await.is_err());
        fanout.publish();
        assert_eq!(sub.next().await, Some(SettledUpdate));
    }

    #[tokio::test]
    async fn closed_when_fanout_dropped() {
        let fanout = UpdateFanout::new();
        let mut sub = fanout.subscribe();
        drop(fanout);
        assert_eq!(sub.next().await, None);
    }
}
