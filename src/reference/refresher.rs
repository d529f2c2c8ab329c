//! Periodic background refresh of the reference cache.

use super::ReferenceCache;
use crate::datasource::LedgerStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Refresh `cache` from `store` every `interval` until `shutdown` flips to `true`.
///
/// A failed refresh is logged and the previous snapshot stays published.
pub fn spawn_refresher(
    cache: Arc<ReferenceCache>,
    store: Arc<dyn LedgerStore>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = cache.refresh(store.as_ref()).await {
                        warn!(
                            error = %e,
                            generation = cache.load().generation(),
                            "Reference refresh failed; keeping previous snapshot"
                        );
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("Reference refresher stopping");
                        break;
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockLedgerStore;

    #[tokio::test]
    async fn test_refresher_publishes_and_stops() {
        let cache = Arc::new(ReferenceCache::default());
        let store: Arc<dyn LedgerStore> = Arc::new(MockLedgerStore::new());
        let (tx, rx) = watch::channel(false);

        let handle = spawn_refresher(cache.clone(), store, Duration::from_millis(10), rx);
        // first tick fires immediately
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(cache.load().generation() >= 1);

        tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
