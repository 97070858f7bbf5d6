//! Scripted live-update feed.

use async_trait::async_trait;
use fleetview_env::{EntityId, EnvError, FeedMessage, LocationFeed};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

type MessageLog = Arc<Mutex<HashMap<EntityId, Vec<FeedMessage>>>>;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// The engine's side of the simulated feed.
pub struct SimFeed {
    /// Receiver for published messages (behind tokio mutex for async)
    rx: tokio::sync::Mutex<mpsc::UnboundedReceiver<FeedMessage>>,

    /// Every message ever published, per sender
    log: MessageLog,
}

/// The harness side: publishes messages and closes the feed.
pub struct SimFeedController {
    tx: Option<mpsc::UnboundedSender<FeedMessage>>,
    log: MessageLog,
    published: u64,
}

/// Creates a connected feed/controller pair.
pub fn sim_feed() -> (SimFeed, SimFeedController) {
    let (tx, rx) = mpsc::unbounded_channel();
    let log: MessageLog = Arc::new(Mutex::new(HashMap::new()));

    let feed = SimFeed {
        rx: tokio::sync::Mutex::new(rx),
        log: Arc::clone(&log),
    };
    let controller = SimFeedController {
        tx: Some(tx),
        log,
        published: 0,
    };
    (feed, controller)
}

impl SimFeedController {
    /// Publishes a message. Returns false if the feed is closed.
    pub fn publish(&mut self, message: FeedMessage) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        lock(&self.log)
            .entry(message.from.clone())
            .or_default()
            .push(message.clone());
        self.published += 1;
        tx.send(message).is_ok()
    }

    /// Closes the feed; the engine sees `recv() -> None` once drained.
    pub fn close(&mut self) {
        self.tx = None;
    }

    pub fn published(&self) -> u64 {
        self.published
    }

    /// Messages published by `id`, oldest first.
    pub fn messages_from(&self, id: &EntityId) -> Vec<FeedMessage> {
        lock(&self.log).get(id).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl LocationFeed for SimFeed {
    async fn recv(&self) -> Option<FeedMessage> {
        let mut rx = self.rx.lock().await;
        rx.recv().await
    }

    async fn last_messages(&self, id: &EntityId, count: usize) -> Result<Vec<FeedMessage>, EnvError> {
        let log = lock(&self.log);
        let messages = log.get(id).map(Vec::as_slice).unwrap_or_default();
        let skip = messages.len().saturating_sub(count);
        Ok(messages[skip..].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fleetview_env::RawLocation;

    fn message(id: &str, lat: f64) -> FeedMessage {
        FeedMessage::new(id, RawLocation::new(lat, 0.0, 0.0, 0.0))
    }

    #[tokio::test]
    async fn test_publish_then_recv() {
        let (feed, mut controller) = sim_feed();
        assert!(controller.publish(message("a", 1.0)));

        let received = feed.recv().await.unwrap();
        assert_eq!(received.from, EntityId::from("a"));
        assert_eq!(controller.published(), 1);
    }

    #[tokio::test]
    async fn test_last_messages_oldest_first() {
        let (feed, mut controller) = sim_feed();
        for lat in [1.0, 2.0, 3.0] {
            controller.publish(message("a", lat));
        }

        let last = feed.last_messages(&EntityId::from("a"), 2).await.unwrap();
        let lats: Vec<_> = last.iter().map(|m| m.latitude.unwrap()).collect();
        assert_eq!(lats, vec![2.0, 3.0]);

        assert!(feed.last_messages(&EntityId::from("b"), 2).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_ends_stream() {
        let (feed, mut controller) = sim_feed();
        controller.publish(message("a", 1.0));
        controller.close();

        assert!(feed.recv().await.is_some());
        assert!(feed.recv().await.is_none());
        assert!(!controller.publish(message("a", 2.0)));
    }
}
