//! Live-update feed abstraction.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{EntityId, FeedMessage};

/// Source of live location messages.
///
/// # Message Flow
///
/// ```text
/// Device                     Feed                      Engine
///   |                          |                          |
///   |-- location ------------->|                          |
///   |                          |-- recv() -> message ---->|
///   |                          |                          |-- ingest + move
/// ```
///
/// The engine subscribes exactly once, at startup.
#[async_trait]
pub trait LocationFeed: Send + Sync + 'static {
    /// Receives the next message.
    ///
    /// # Returns
    /// * `Some(message)` - A message was received
    /// * `None` - The feed was closed (shutdown)
    async fn recv(&self) -> Option<FeedMessage>;

    /// Fetches up to `count` of the most recent messages sent by `id`,
    /// oldest first.
    ///
    /// Used when an entity is first shown, so that its freshest position is
    /// known before its marker is drawn.
    async fn last_messages(&self, id: &EntityId, count: usize) -> Result<Vec<FeedMessage>, EnvError>;
}
