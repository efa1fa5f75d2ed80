use tokio::sync::broadcast;

use crate::models::RefreshEvent;

/// Best-effort delivery of refresh events. Publishing never fails the caller.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, event: RefreshEvent);
}

/// Fan-out hub for live subscribers. A subscriber that drops its receiver is
/// gone on the next send; one that falls more than `capacity` events behind
/// skips ahead and is told how many it missed.
pub struct Broadcaster {
    tx: broadcast::Sender<RefreshEvent>,
}

impl Broadcaster {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshEvent> {
        self.tx.subscribe()
    }
}

impl NotificationSink for Broadcaster {
    fn publish(&self, event: RefreshEvent) {
        match self.tx.send(event) {
            Ok(receivers) => tracing::debug!("Refresh event delivered to {} subscribers", receivers),
            Err(_) => tracing::debug!("Refresh event dropped: no subscribers"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_live_subscriber_receives_the_event() {
        let hub = Broadcaster::new(8);
        let mut a = hub.subscribe();
        let mut b = hub.subscribe();

        hub.publish(RefreshEvent::new(2));

        assert_eq!(a.recv().await.unwrap().inserted, 2);
        assert_eq!(b.recv().await.unwrap().inserted, 2);
    }

    #[tokio::test]
    async fn dropped_subscribers_do_not_break_publishing() {
        let hub = Broadcaster::new(8);
        drop(hub.subscribe());
        hub.publish(RefreshEvent::new(1));

        let mut late = hub.subscribe();
        hub.publish(RefreshEvent::new(4));
        assert_eq!(late.recv().await.unwrap().inserted, 4);
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let hub = Broadcaster::new(1);
        let mut slow = hub.subscribe();
        hub.publish(RefreshEvent::new(1));
        hub.publish(RefreshEvent::new(2));

        assert!(matches!(
            slow.recv().await,
            Err(broadcast::error::RecvError::Lagged(1))
        ));
        assert_eq!(slow.recv().await.unwrap().inserted, 2);
    }
}
