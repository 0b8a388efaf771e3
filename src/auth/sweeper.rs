//! Expired-credential sweep.

use std::{sync::Arc, time::Duration};

use tokio::{task::JoinHandle, time};
use tracing::{debug, warn};

use crate::{auth::repository::RefreshTokenStore, clock::Clock};

/// Spawn the periodic purge of expired renewal credentials.
///
/// Runs on its own timer task and never blocks request-serving paths; it
/// only targets rows already past `expires_at`, which is safe concurrently
/// with every other store operation. A failed sweep is logged and retried
/// on the next tick.
pub fn spawn_purge_task(
    store: Arc<dyn RefreshTokenStore>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;

            match store.purge_expired(clock.now()).await {
                Ok(0) => {}
                Ok(purged) => debug!(purged, "purged expired refresh tokens"),
                Err(error) => warn!(%error, "refresh token purge failed"),
            }
        }
    })
}
