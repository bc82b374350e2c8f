//! Collects target results into the sealed [`RunReport`].
//!
//! The aggregator is the only owner of the counters and the result table; the
//! dispatcher reaches it exclusively through the result channel.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::SystemTime;

use multiping_common::{Counters, RunReport, RunStatus, TargetResult};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::dispatcher::DispatchSummary;

/// Snapshot handed to the progress observer after every arrival.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub resolved: usize,
    pub total: usize,
    pub counters: Counters,
}

pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

pub struct Aggregator {
    total: usize,
    results: BTreeMap<usize, TargetResult>,
    counters: Counters,
    on_progress: Option<ProgressCallback>,
    started_at: SystemTime,
    started: Instant,
}

impl Aggregator {
    /// `total` is the number of targets submitted to the dispatcher.
    pub fn new(total: usize) -> Self {
        Self {
            total,
            results: BTreeMap::new(),
            counters: Counters::default(),
            on_progress: None,
            started_at: SystemTime::now(),
            started: Instant::now(),
        }
    }

    pub fn with_progress(mut self, callback: Option<ProgressCallback>) -> Self {
        self.on_progress = callback;
        self
    }

    /// Drains `rx` until every sender is gone.
    pub async fn collect(&mut self, mut rx: mpsc::Receiver<TargetResult>) {
        while let Some(result) = rx.recv().await {
            self.accept(result);
        }
    }

    /// Files one result. A second result for the same target is dropped.
    pub fn accept(&mut self, result: TargetResult) {
        let index = result.target().index();
        if self.results.contains_key(&index) {
            warn!("duplicate result for {} dropped", result.target());
            return;
        }

        debug!("{} resolved as {:?}", result.target(), result.classification());
        self.counters.record(result.classification());
        self.results.insert(index, result);

        if let Some(callback) = &self.on_progress {
            callback(Progress {
                resolved: self.results.len(),
                total: self.total,
                counters: self.counters,
            });
        }
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    /// Freezes the collected results into a report, in submission order.
    ///
    /// The run is `Aborted` when any target was abandoned, `Completed` only
    /// when every target is Reachable, and `CompletedWithFailures` otherwise.
    /// An Unreachable target is a failure even when nothing is Errored.
    pub fn seal(self, summary: DispatchSummary) -> RunReport {
        if self.results.len() != self.total {
            warn!(
                "{} of {} targets reported a result",
                self.results.len(),
                self.total
            );
        }

        let status = if summary.abandoned > 0 {
            RunStatus::Aborted
        } else if self.counters.reachable == self.counters.total {
            RunStatus::Completed
        } else {
            RunStatus::CompletedWithFailures
        };
        let abort_cause = match status {
            RunStatus::Aborted => summary.cause,
            _ => None,
        };

        RunReport::new(
            self.results.into_values().collect(),
            self.counters,
            self.started_at,
            self.started.elapsed(),
            status,
            abort_cause,
        )
    }
}

impl fmt::Debug for Aggregator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Aggregator")
            .field("total", &self.total)
            .field("resolved", &self.results.len())
            .field("counters", &self.counters)
            .finish()
    }
}
