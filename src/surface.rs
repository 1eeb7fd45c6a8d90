//! Map Surface adapter - debounced persistence of marker moves
//!
//! User-driven marker moves arrive in bursts while dragging. Only the last
//! position after a quiet window is written to the store; everything in
//! between is dropped. Marker moves never trigger a resolve.

use crate::coordinate::Coordinate;
use crate::storage::LocationStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Quiet window before a marker position is persisted
pub const DEFAULT_QUIET_PERIOD: Duration = Duration::from_millis(250);

pub struct MarkerDebouncer {
    latest: watch::Sender<Option<Coordinate>>,
    worker: JoinHandle<()>,
}

impl MarkerDebouncer {
    pub fn spawn(store: Arc<LocationStore>, quiet: Duration) -> Self {
        let (latest, rx) = watch::channel(None);
        let worker = tokio::spawn(debounce_loop(store, rx, quiet));
        Self { latest, worker }
    }

    /// Record a new marker position. Restarts the quiet window.
    pub fn position_changed(&self, coordinate: Coordinate) {
        self.latest.send_replace(Some(coordinate));
    }

    /// Stop accepting positions, persist any pending one, and wait for the worker.
    pub async fn close(self) {
        let Self { latest, worker } = self;
        drop(latest);
        if let Err(e) = worker.await {
            tracing::warn!("Marker debounce worker failed: {}", e);
        }
    }
}

async fn debounce_loop(
    store: Arc<LocationStore>,
    mut rx: watch::Receiver<Option<Coordinate>>,
    quiet: Duration,
) {
    loop {
        if rx.changed().await.is_err() {
            return;
        }

        let closed = loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break true;
                    }
                }
                _ = tokio::time::sleep(quiet) => break false,
            }
        };

        let pending = *rx.borrow_and_update();
        if let Some(coordinate) = pending {
            tracing::debug!("Persisting marker position {}", coordinate);
            if let Err(e) = store.put(coordinate).await {
                tracing::warn!("Failed to persist marker position {}: {}", coordinate, e);
            }
        }

        if closed {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryKeyValueStore;
    use crate::testing::CountingConnector;

    fn counted_store() -> (Arc<CountingConnector>, Arc<LocationStore>) {
        let connector = Arc::new(CountingConnector::in_memory());
        let store = Arc::new(LocationStore::new(
            connector.clone(),
            Arc::new(MemoryKeyValueStore::new()),
        ));
        (connector, store)
    }

    #[tokio::test]
    async fn test_burst_persists_only_last_position() {
        let (connector, store) = counted_store();
        let debouncer = MarkerDebouncer::spawn(store.clone(), DEFAULT_QUIET_PERIOD);

        for i in 0..5 {
            debouncer.position_changed(Coordinate::new(10.0 + i as f64, 20.0));
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        tokio::time::sleep(Duration::from_millis(600)).await;

        assert_eq!(connector.writes(), 1);
        assert_eq!(connector.written(), vec![Coordinate::new(14.0, 20.0)]);
        assert_eq!(store.get().await, Some(Coordinate::new(14.0, 20.0)));

        debouncer.close().await;
        assert_eq!(connector.writes(), 1);
    }

    #[tokio::test]
    async fn test_separate_bursts_persist_separately() {
        let (connector, store) = counted_store();
        let debouncer = MarkerDebouncer::spawn(store, Duration::from_millis(50));

        debouncer.position_changed(Coordinate::new(1.0, 1.0));
        tokio::time::sleep(Duration::from_millis(300)).await;
        debouncer.position_changed(Coordinate::new(2.0, 2.0));
        tokio::time::sleep(Duration::from_millis(300)).await;

        assert_eq!(
            connector.written(),
            vec![Coordinate::new(1.0, 1.0), Coordinate::new(2.0, 2.0)]
        );
        debouncer.close().await;
    }

    #[tokio::test]
    async fn test_close_flushes_pending_position() {
        let (connector, store) = counted_store();
        let debouncer = MarkerDebouncer::spawn(store, Duration::from_secs(30));

        debouncer.position_changed(Coordinate::new(5.0, 6.0));
        debouncer.close().await;

        assert_eq!(connector.written(), vec![Coordinate::new(5.0, 6.0)]);
    }

    #[tokio::test]
    async fn test_close_without_positions_writes_nothing() {
        let (connector, store) = counted_store();
        MarkerDebouncer::spawn(store, DEFAULT_QUIET_PERIOD).close().await;
        assert_eq!(connector.writes(), 0);
    }

    #[tokio::test]
    async fn test_invalid_marker_position_is_dropped() {
        let (connector, store) = counted_store();
        let debouncer = MarkerDebouncer::spawn(store.clone(), Duration::from_millis(20));

        debouncer.position_changed(Coordinate::new(0.0, 500.0));
        debouncer.close().await;

        assert_eq!(connector.writes(), 0);
        assert_eq!(store.get().await, None);
    }
}
