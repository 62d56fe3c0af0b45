//! Watch session: owns the notify subscription, the router loop, and the
//! in-flight pipelines.
//!
//! # Design
//! - The notify callback runs on the backend's thread and only forwards raw
//!   events into a bounded channel; translation and routing happen on tokio.
//! - Shutdown cancels a single token, drops the subscription, and waits for
//!   every pipeline to reach a terminal state before returning.
//! - The router loop runs until the channel closes, which happens once the
//!   watcher (and the sender its callback owns) is dropped. Events still
//!   queued at that point are routed as `ShuttingDown`.

use std::sync::Arc;

use dropzone_config::WatchConfig;
use dropzone_events::{Event, EventBus};
use dropzone_telemetry::{Metrics, MetricsSnapshot};
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::router::EventRouter;
use crate::source::translate;

/// Capacity of the channel between the notify callback and the router loop.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A running watch on one directory.
pub struct WatchSession {
    config: Arc<WatchConfig>,
    events: EventBus,
    metrics: Metrics,
    router: EventRouter,
    watcher: Option<RecommendedWatcher>,
    router_task: Option<JoinHandle<()>>,
    tracker: TaskTracker,
    cancel: CancellationToken,
}

impl WatchSession {
    /// Subscribe to the watch directory and start routing events.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Watch`] when the notification backend cannot be
    /// created or the directory cannot be watched.
    pub fn start(config: Arc<WatchConfig>, events: EventBus, metrics: Metrics) -> AppResult<Self> {
        let watch_dir = config.watch_directory.clone();
        let (tx, rx) = mpsc::channel::<notify::Result<notify::Event>>(EVENT_CHANNEL_CAPACITY);

        let mut watcher = RecommendedWatcher::new(
            move |result| {
                // The receiver is gone only once the session is shutting down.
                let _ = tx.blocking_send(result);
            },
            notify::Config::default(),
        )
        .map_err(|err| AppError::watch("watcher.new", &watch_dir, err))?;
        watcher
            .watch(&watch_dir, RecursiveMode::NonRecursive)
            .map_err(|err| AppError::watch("watcher.watch", &watch_dir, err))?;

        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        let router = EventRouter::new(
            Arc::clone(&config),
            events.clone(),
            metrics.clone(),
            tracker.clone(),
            cancel.clone(),
        );
        let router_task = tokio::spawn(router_loop(rx, router.clone()));

        let _ = events.publish(Event::SessionStarted {
            watch_dir: watch_dir.clone(),
            action: config.action.to_string(),
        });
        info!(watch_dir = %watch_dir.display(), "watch session started");

        Ok(Self {
            config,
            events,
            metrics,
            router,
            watcher: Some(watcher),
            router_task: Some(router_task),
            tracker,
            cancel,
        })
    }

    /// Validated configuration this session runs with.
    #[must_use]
    pub fn config(&self) -> &WatchConfig {
        &self.config
    }

    /// Lifecycle event bus.
    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    /// Session metrics.
    #[must_use]
    pub const fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Number of pipelines currently running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.router.in_flight()
    }

    /// Stop watching, cancel pending pipelines, and wait for them to finish.
    ///
    /// # Errors
    ///
    /// Returns [`AppError::Join`] if the router loop panicked.
    pub async fn shutdown(mut self) -> AppResult<MetricsSnapshot> {
        info!(in_flight = self.router.in_flight(), "watch session stopping");
        self.cancel.cancel();
        // Dropping the watcher drops the sender and lets the router loop end.
        drop(self.watcher.take());

        if let Some(task) = self.router_task.take() {
            task.await.map_err(|source| AppError::Join {
                operation: "router.join",
                source,
            })?;
        }

        self.tracker.close();
        self.tracker.wait().await;

        let _ = self.events.publish(Event::SessionStopped);
        let snapshot = self.metrics.snapshot();
        info!(
            routed = snapshot.files_routed_total,
            applied = snapshot.applied_total,
            skipped = snapshot.skipped_total,
            gave_up = snapshot.gave_up_total,
            failed = snapshot.failed_total,
            "watch session stopped"
        );
        Ok(snapshot)
    }
}

impl Drop for WatchSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn router_loop(mut rx: mpsc::Receiver<notify::Result<notify::Event>>, router: EventRouter) {
    while let Some(result) = rx.recv().await {
        match result {
            Ok(event) => {
                for file_event in translate(event) {
                    let decision = router.route(file_event);
                    debug!(?decision, "event routed");
                }
            }
            Err(err) => warn!(error = %err, "watch backend reported an error"),
        }
    }
    debug!("router loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropzone_test_support::fixtures::{DropTree, write_bytes};
    use notify::EventKind;
    use notify::event::CreateKind;
    use std::time::Duration;

    #[tokio::test]
    async fn router_loop_outlives_cancellation_until_sender_drops() -> anyhow::Result<()> {
        let tree = DropTree::new()?;
        let config = Arc::new(tree.config("move", None)?);
        let metrics = Metrics::new()?;
        let tracker = TaskTracker::new();
        let cancel = CancellationToken::new();
        let router = EventRouter::new(
            config,
            EventBus::new(),
            metrics.clone(),
            tracker.clone(),
            cancel.clone(),
        );
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let handle = tokio::spawn(router_loop(rx, router.clone()));

        cancel.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());

        // Late events are still consumed, but no pipeline starts.
        let late = write_bytes(tree.watch(), "late.bin", b"late")?;
        let event = notify::Event::new(EventKind::Create(CreateKind::File)).add_path(late.clone());
        tx.send(Ok(event))
            .await
            .map_err(|_| anyhow::anyhow!("router loop closed early"))?;
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!handle.is_finished());
        assert_eq!(router.in_flight(), 0);
        assert_eq!(metrics.snapshot().files_routed_total, 0);

        drop(tx);
        tokio::time::timeout(Duration::from_secs(1), handle).await??;
        tracker.close();
        tracker.wait().await;
        assert!(late.exists());
        Ok(())
    }
}
