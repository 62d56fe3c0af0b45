//! Event router: turns file events into per-file readiness pipelines.
//!
//! # Design
//! - `route` never blocks: it filters, registers the path, and spawns.
//! - At most one pipeline per path. Events for a path with a live pipeline
//!   are coalesced until that pipeline ends, however it ends.
//! - Pipelines observe a child of the session's cancellation token at every
//!   poll boundary.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use dropzone_config::WatchConfig;
use dropzone_events::{Event, EventBus, GiveUpReason};
use dropzone_fsops::{
    ActionDispatcher, AppliedAction, FsOpsError, LockOutcome, ReadinessState, StabilityOutcome,
};
use dropzone_telemetry::{Metrics, PipelineOutcome, pipeline_span, record_stage};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span, debug, error, info, warn};

use crate::source::FileEvent;

/// What the router did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteDecision {
    /// A new pipeline was started for the path.
    Spawned,
    /// A pipeline for the path is already running.
    Coalesced,
    /// The event was dropped.
    Ignored(IgnoreReason),
}

/// Why an event was dropped without starting a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    /// The target is a directory.
    Directory,
    /// The name ends in a transient download or temp suffix.
    Transient,
    /// The target is not a direct child of the watched directory.
    OutsideWatchDir,
    /// The session is shutting down.
    ShuttingDown,
}

/// Routes file events to per-file pipelines.
#[derive(Clone)]
pub struct EventRouter {
    shared: Arc<RouterShared>,
}

struct RouterShared {
    config: Arc<WatchConfig>,
    dispatcher: ActionDispatcher,
    events: EventBus,
    metrics: Metrics,
    tracker: TaskTracker,
    cancel: CancellationToken,
    in_flight: Mutex<HashMap<PathBuf, CancellationToken>>,
}

impl RouterShared {
    fn lock_in_flight(&self) -> MutexGuard<'_, HashMap<PathBuf, CancellationToken>> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Removes a path from the in-flight registry when its pipeline ends.
struct InFlightGuard {
    shared: Arc<RouterShared>,
    path: PathBuf,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        let _ = self.shared.lock_in_flight().remove(&self.path);
    }
}

impl EventRouter {
    /// Build a router whose pipelines run on `tracker` and stop when
    /// `cancel` fires.
    #[must_use]
    pub fn new(
        config: Arc<WatchConfig>,
        events: EventBus,
        metrics: Metrics,
        tracker: TaskTracker,
        cancel: CancellationToken,
    ) -> Self {
        let dispatcher = ActionDispatcher::new(Arc::clone(&config));
        Self {
            shared: Arc::new(RouterShared {
                config,
                dispatcher,
                events,
                metrics,
                tracker,
                cancel,
                in_flight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Route one event. Must be called from within a tokio runtime.
    #[must_use = "the decision says whether a pipeline was started"]
    pub fn route(&self, event: FileEvent) -> RouteDecision {
        let shared = &self.shared;
        let path = event.target().to_path_buf();

        if event.is_dir {
            debug!(path = %path.display(), "ignoring directory");
            return RouteDecision::Ignored(IgnoreReason::Directory);
        }
        if !shared.config.is_direct_child(&path) {
            debug!(path = %path.display(), "ignoring entry outside watched directory");
            return RouteDecision::Ignored(IgnoreReason::OutsideWatchDir);
        }
        if shared.config.naming.is_transient(&path) {
            info!(path = %path.display(), "skipped-temp");
            return RouteDecision::Ignored(IgnoreReason::Transient);
        }
        if shared.cancel.is_cancelled() {
            return RouteDecision::Ignored(IgnoreReason::ShuttingDown);
        }

        let token = {
            let mut in_flight = shared.lock_in_flight();
            if in_flight.contains_key(&path) {
                drop(in_flight);
                shared.metrics.inc_events_coalesced();
                debug!(path = %path.display(), "event coalesced into running pipeline");
                return RouteDecision::Coalesced;
            }
            let token = shared.cancel.child_token();
            let _ = in_flight.insert(path.clone(), token.clone());
            token
        };

        info!(path = %path.display(), trigger = ?event.trigger(), "New file detected");
        let _ = shared.events.publish(Event::FileDetected {
            path: path.clone(),
            trigger: event.trigger(),
        });
        shared.metrics.inc_files_routed();

        let guard = InFlightGuard {
            shared: Arc::clone(shared),
            path: path.clone(),
        };
        let span = pipeline_span(&path);
        let _ = shared
            .tracker
            .spawn(run_pipeline(guard, token).instrument(span));
        RouteDecision::Spawned
    }

    /// Number of pipelines currently registered.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.shared.lock_in_flight().len()
    }

    /// Whether a pipeline is registered for `path`.
    #[must_use]
    pub fn is_in_flight(&self, path: &Path) -> bool {
        self.shared.lock_in_flight().contains_key(path)
    }
}

async fn run_pipeline(guard: InFlightGuard, cancel: CancellationToken) {
    let shared = Arc::clone(&guard.shared);
    let path = guard.path.clone();
    let outcome = readiness_then_dispatch(&shared, &path, &cancel).await;
    shared.metrics.record_outcome(outcome);
    drop(guard);
}

async fn readiness_then_dispatch(
    shared: &RouterShared,
    path: &Path,
    cancel: &CancellationToken,
) -> PipelineOutcome {
    let policy = shared.config.readiness;
    let span = Span::current();
    let mut state = ReadinessState::new();

    record_stage(&span, "lock");
    let _ = shared.events.publish(Event::AwaitingUnlock {
        path: path.to_path_buf(),
    });
    match state
        .await_unlocked(
            path,
            policy.lock_timeout,
            policy.lock_poll_interval,
            cancel,
        )
        .await
    {
        LockOutcome::Unlocked => {}
        LockOutcome::Vanished => return give_up(shared, path, GiveUpReason::Vanished),
        LockOutcome::TimedOut => {
            warn!(
                attempts = state.lock_attempts,
                timeout_secs = policy.lock_timeout.as_secs(),
                "file stayed locked; giving up"
            );
            return give_up(shared, path, GiveUpReason::LockTimeout);
        }
        LockOutcome::Cancelled => return give_up(shared, path, GiveUpReason::Cancelled),
    }

    record_stage(&span, "stability");
    let _ = shared.events.publish(Event::Stabilizing {
        path: path.to_path_buf(),
    });
    let size = match state
        .await_stable(
            path,
            policy.stable_polls,
            policy.stability_poll_interval,
            cancel,
        )
        .await
    {
        StabilityOutcome::Stable { size } => size,
        StabilityOutcome::Vanished => return give_up(shared, path, GiveUpReason::Vanished),
        StabilityOutcome::Unreadable => {
            warn!(
                failures = state.stat_errors,
                "file size could not be read; giving up"
            );
            return give_up(shared, path, GiveUpReason::Unreadable);
        }
        StabilityOutcome::Cancelled => return give_up(shared, path, GiveUpReason::Cancelled),
    };
    debug!(size, lock_attempts = state.lock_attempts, "file is stable");

    record_stage(&span, "grace");
    tokio::select! {
        () = cancel.cancelled() => return give_up(shared, path, GiveUpReason::Cancelled),
        () = sleep(policy.grace_period) => {}
    }

    record_stage(&span, "dispatch");
    let dispatcher = shared.dispatcher.clone();
    let target = path.to_path_buf();
    match tokio::task::spawn_blocking(move || dispatcher.apply(&target)).await {
        Ok(Ok(action)) => report_action(shared, action),
        Ok(Err(err)) => report_failure(shared, path, &err),
        Err(join) => {
            error!(error = %join, "dispatcher task failed");
            let _ = shared.events.publish(Event::ActionFailed {
                path: path.to_path_buf(),
                message: join.to_string(),
            });
            PipelineOutcome::Failed
        }
    }
}

fn give_up(shared: &RouterShared, path: &Path, reason: GiveUpReason) -> PipelineOutcome {
    match reason {
        GiveUpReason::Vanished => info!("file vanished before it was ready; giving up"),
        GiveUpReason::LockTimeout | GiveUpReason::Unreadable => {}
        GiveUpReason::Cancelled => debug!("pipeline cancelled by shutdown"),
    }
    let _ = shared.events.publish(Event::GaveUp {
        path: path.to_path_buf(),
        reason,
    });
    PipelineOutcome::GaveUp
}

fn report_action(shared: &RouterShared, action: AppliedAction) -> PipelineOutcome {
    let label = action.label();
    match action {
        AppliedAction::Moved { from, to } | AppliedAction::Renamed { from, to } => {
            let _ = shared.events.publish(Event::ActionApplied {
                path: from,
                action: label.to_string(),
                destination: to,
            });
            PipelineOutcome::Applied
        }
        AppliedAction::NoOp { path } => {
            let _ = shared.events.publish(Event::ActionApplied {
                destination: path.clone(),
                path,
                action: label.to_string(),
            });
            PipelineOutcome::Applied
        }
        AppliedAction::Skipped { path, reason } => {
            info!(reason = reason.as_str(), "file skipped");
            let _ = shared.events.publish(Event::ActionSkipped {
                path,
                reason: reason.as_str().to_string(),
            });
            PipelineOutcome::Skipped
        }
    }
}

fn report_failure(shared: &RouterShared, path: &Path, err: &FsOpsError) -> PipelineOutcome {
    let message = match err {
        FsOpsError::DestinationCollision { path: existing } => {
            format!("{err}: {} already exists", existing.display())
        }
        FsOpsError::Io {
            operation, source, ..
        } => format!("{err}: {operation}: {source}"),
        FsOpsError::InvalidInput { field, reason, .. } => format!("{err}: {field} {reason}"),
    };
    error!(operation = err.operation(), error = ?err, "action failed");
    let _ = shared.events.publish(Event::ActionFailed {
        path: path.to_path_buf(),
        message,
    });
    PipelineOutcome::Failed
}
