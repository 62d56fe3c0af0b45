//! Prometheus-backed counters and snapshot helpers.
//!
//! # Design
//! - Collectors are owned directly; the session reads them back through
//!   [`Metrics::snapshot`] for its shutdown summary.
//! - Tracks only what the watch session produces: routed files, coalesced
//!   duplicate events, pipeline outcomes, and in-flight pipelines.

use std::sync::Arc;

use prometheus::{IntCounter, IntCounterVec, IntGauge, Opts};
use serde::Serialize;

use crate::error::{Result, TelemetryError};

/// Terminal result of one per-file pipeline, used as a metrics label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// The configured action completed.
    Applied,
    /// The file was left alone (filtered, already renamed, or no action).
    Skipped,
    /// The pipeline gave up waiting (lock timeout, vanished, cancelled).
    GaveUp,
    /// The action raised an error.
    Failed,
}

impl PipelineOutcome {
    /// Label value recorded on the outcome counter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Skipped => "skipped",
            Self::GaveUp => "gave_up",
            Self::Failed => "failed",
        }
    }
}

/// Prometheus-backed collectors shared by the watch session.
#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    files_routed_total: IntCounter,
    events_coalesced_total: IntCounter,
    pipeline_outcomes_total: IntCounterVec,
    in_flight_pipelines: IntGauge,
}

/// Snapshot of counters and gauges for status reporting.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Files handed to a new pipeline.
    pub files_routed_total: u64,
    /// Events dropped because a pipeline for the path was already running.
    pub events_coalesced_total: u64,
    /// Pipelines that applied their action.
    pub applied_total: u64,
    /// Pipelines that skipped their file.
    pub skipped_total: u64,
    /// Pipelines that gave up waiting.
    pub gave_up_total: u64,
    /// Pipelines whose action failed.
    pub failed_total: u64,
    /// Pipelines currently running.
    pub in_flight_pipelines: i64,
}

impl Metrics {
    /// Construct the session collectors.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the Prometheus collectors cannot be built.
    pub fn new() -> Result<Self> {
        let files_routed_total = IntCounter::with_opts(Opts::new(
            "files_routed_total",
            "Files handed to a readiness pipeline",
        ))
        .map_err(|source| collector_error("files_routed_total", source))?;
        let events_coalesced_total = IntCounter::with_opts(Opts::new(
            "events_coalesced_total",
            "Filesystem events absorbed by an in-flight pipeline",
        ))
        .map_err(|source| collector_error("events_coalesced_total", source))?;
        let pipeline_outcomes_total = IntCounterVec::new(
            Opts::new(
                "pipeline_outcomes_total",
                "Per-file pipelines finished, by outcome",
            ),
            &["outcome"],
        )
        .map_err(|source| collector_error("pipeline_outcomes_total", source))?;
        let in_flight_pipelines = IntGauge::with_opts(Opts::new(
            "in_flight_pipelines",
            "Per-file pipelines currently running",
        ))
        .map_err(|source| collector_error("in_flight_pipelines", source))?;

        Ok(Self {
            inner: Arc::new(MetricsInner {
                files_routed_total,
                events_coalesced_total,
                pipeline_outcomes_total,
                in_flight_pipelines,
            }),
        })
    }

    /// Record that a file was handed to a fresh pipeline.
    pub fn inc_files_routed(&self) {
        self.inner.files_routed_total.inc();
        self.inner.in_flight_pipelines.inc();
    }

    /// Record that a duplicate event was absorbed by a running pipeline.
    pub fn inc_events_coalesced(&self) {
        self.inner.events_coalesced_total.inc();
    }

    /// Record a finished pipeline.
    pub fn record_outcome(&self, outcome: PipelineOutcome) {
        self.inner
            .pipeline_outcomes_total
            .with_label_values(&[outcome.as_str()])
            .inc();
        self.inner.in_flight_pipelines.dec();
    }

    /// Produce a snapshot of the current counters.
    #[must_use]
    pub fn snapshot(&self) -> MetricsSnapshot {
        let outcome = |value: PipelineOutcome| {
            self.inner
                .pipeline_outcomes_total
                .with_label_values(&[value.as_str()])
                .get()
        };
        MetricsSnapshot {
            files_routed_total: self.inner.files_routed_total.get(),
            events_coalesced_total: self.inner.events_coalesced_total.get(),
            applied_total: outcome(PipelineOutcome::Applied),
            skipped_total: outcome(PipelineOutcome::Skipped),
            gave_up_total: outcome(PipelineOutcome::GaveUp),
            failed_total: outcome(PipelineOutcome::Failed),
            in_flight_pipelines: self.inner.in_flight_pipelines.get(),
        }
    }
}

const fn collector_error(name: &'static str, source: prometheus::Error) -> TelemetryError {
    TelemetryError::MetricsCollector { name, source }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_tracks_routing_and_outcomes() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        metrics.inc_files_routed();
        metrics.inc_files_routed();
        metrics.inc_events_coalesced();
        metrics.record_outcome(PipelineOutcome::Applied);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.files_routed_total, 2);
        assert_eq!(snapshot.events_coalesced_total, 1);
        assert_eq!(snapshot.applied_total, 1);
        assert_eq!(snapshot.failed_total, 0);
        assert_eq!(snapshot.in_flight_pipelines, 1);

        metrics.record_outcome(PipelineOutcome::GaveUp);
        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.gave_up_total, 1);
        assert_eq!(snapshot.in_flight_pipelines, 0);
        Ok(())
    }

    #[test]
    fn snapshot_serialises_to_json() -> anyhow::Result<()> {
        let metrics = Metrics::new()?;
        let value = serde_json::to_value(metrics.snapshot())?;
        assert_eq!(value["files_routed_total"], 0);
        assert_eq!(value["in_flight_pipelines"], 0);
        Ok(())
    }
}
