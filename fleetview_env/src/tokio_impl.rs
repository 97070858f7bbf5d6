//! `FleetViewContext` over the ambient Tokio runtime and the OS clock.

use crate::FleetViewContext;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug_span, Instrument};

/// Context used outside the simulator.
///
/// Collaborator tasks land on whatever runtime is current when `spawn` is
/// called, so the engine must be driven from inside one.
pub struct TokioContext {
    created: Instant,
}

impl TokioContext {
    pub fn new() -> Self {
        Self {
            created: Instant::now(),
        }
    }

    /// Convenience for engine construction, which takes `Arc<Ctx>`.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FleetViewContext for TokioContext {
    fn now(&self) -> Duration {
        self.created.elapsed()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn<F>(&self, name: &str, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let span = debug_span!("collaborator", task = name);
        tokio::spawn(future.instrument(span));
    }

    fn seed(&self) -> u64 {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clock_advances_across_sleep() {
        let ctx = TokioContext::new();
        let before = ctx.now();
        ctx.sleep(Duration::from_millis(10)).await;

        assert!(ctx.now() - before >= Duration::from_millis(10));
    }

    #[test]
    fn test_epoch_millis_tracks_wall_clock() {
        let ctx = TokioContext::default();
        let wall = SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_millis() as i64;

        let millis = ctx.epoch_millis();
        assert!((millis - wall).abs() < 1_000);
        assert_eq!(ctx.seed(), 0);
    }

    #[tokio::test]
    async fn test_spawned_task_reports_back() {
        let ctx = TokioContext::shared();
        let (tx, rx) = tokio::sync::oneshot::channel();
        ctx.spawn("lookup", async move {
            let _ = tx.send("done");
        });

        assert_eq!(rx.await.unwrap(), "done");
    }
}
