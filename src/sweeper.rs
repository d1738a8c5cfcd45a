use crate::service::GameService;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Spawn a background task that expires silent participants on every team
pub fn spawn_presence_purger(service: Arc<GameService>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            service.purge_all(Instant::now()).await;
        }
    })
}
