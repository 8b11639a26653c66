use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use estate_auth::Clock;
use estate_core::SessionStore;

/// Handle to control and join a background worker.
#[derive(Debug)]
pub struct WorkerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Request graceful shutdown and wait for the worker to stop.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.join.await {
            warn!(error = %err, "worker task did not stop cleanly");
        }
    }
}

/// Periodically deletes expired session rows.
///
/// Expiry is enforced on every lookup regardless; the sweeper only keeps the
/// table from growing without bound.
#[derive(Debug)]
pub struct SessionSweeper;

impl SessionSweeper {
    pub fn spawn<S>(store: Arc<S>, clock: Arc<dyn Clock>, every: Duration) -> WorkerHandle
    where
        S: SessionStore + ?Sized + 'static,
    {
        let (shutdown, mut stop) = watch::channel(false);

        let join = tokio::spawn(async move {
            let mut tick = tokio::time::interval(every);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            info!(interval_secs = every.as_secs(), "session sweeper started");

            loop {
                tokio::select! {
                    _ = tick.tick() => {
                        match store.purge_expired(clock.now()).await {
                            Ok(0) => {}
                            Ok(purged) => debug!(purged, "expired sessions purged"),
                            Err(err) => warn!(error = %err, "session purge failed"),
                        }
                    }
                    changed = stop.changed() => {
                        if changed.is_err() || *stop.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("session sweeper stopped");
        });

        WorkerHandle { shutdown, join }
    }
}
