//! # Run Report
//!
//! The values a run hands to rendering code. Nothing here is mutated after the
//! aggregator seals the report; renderers read these fields and nothing else.

use std::time::{Duration, SystemTime};

use crate::network::protocol::ProtocolId;
use crate::network::target::Target;
use crate::probing::ProbeOutcome;

pub const EXIT_COMPLETED: u8 = 0;
pub const EXIT_COMPLETED_WITH_FAILURES: u8 = 1;
pub const EXIT_ABORTED: u8 = 2;
pub const EXIT_CONFIGURATION_ERROR: u8 = 64;

/// Final verdict for one target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Reachable,
    Unreachable,
    /// The prober misbehaved, the peer spoke garbage, or the target was
    /// abandoned before it could be resolved.
    Errored,
}

/// The retry-resolved outcome of one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetResult {
    target: Target,
    attempts: Vec<ProbeOutcome>,
    classification: Classification,
    abandoned: bool,
}

impl TargetResult {
    /// Resolves a target from its completed attempts, oldest first.
    pub fn resolved(target: Target, attempts: Vec<ProbeOutcome>) -> Self {
        debug_assert!(!attempts.is_empty(), "a resolved target has at least one attempt");
        let classification = match attempts.last() {
            Some(ProbeOutcome::Success { .. }) => Classification::Reachable,
            Some(ProbeOutcome::Failure { kind, .. }) if kind.is_client_defect() => {
                Classification::Errored
            }
            Some(_) => Classification::Unreachable,
            None => Classification::Errored,
        };
        Self {
            target,
            attempts,
            classification,
            abandoned: false,
        }
    }

    /// Resolves a target the run gave up on. A synthetic timeout marks the
    /// point of abandonment.
    pub fn abandoned(target: Target, mut attempts: Vec<ProbeOutcome>) -> Self {
        attempts.push(ProbeOutcome::Timeout);
        Self {
            target,
            attempts,
            classification: Classification::Errored,
            abandoned: true,
        }
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn attempts(&self) -> &[ProbeOutcome] {
        &self.attempts
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn is_abandoned(&self) -> bool {
        self.abandoned
    }

    pub fn final_outcome(&self) -> Option<&ProbeOutcome> {
        self.attempts.last()
    }

    /// Latency of the successful attempt, if there was one.
    pub fn latency(&self) -> Option<Duration> {
        self.attempts.iter().rev().find_map(ProbeOutcome::latency)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Counters {
    pub total: usize,
    pub reachable: usize,
    pub unreachable: usize,
    pub errored: usize,
}

impl Counters {
    pub fn record(&mut self, classification: Classification) {
        self.total += 1;
        match classification {
            Classification::Reachable => self.reachable += 1,
            Classification::Unreachable => self.unreachable += 1,
            Classification::Errored => self.errored += 1,
        }
    }

    /// Sum of the per-classification counts; always equals `total`.
    pub fn classified(&self) -> usize {
        self.reachable + self.unreachable + self.errored
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    CompletedWithFailures,
    Aborted,
}

impl RunStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            RunStatus::Completed => EXIT_COMPLETED,
            RunStatus::CompletedWithFailures => EXIT_COMPLETED_WITH_FAILURES,
            RunStatus::Aborted => EXIT_ABORTED,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortCause {
    DeadlineElapsed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    results: Vec<TargetResult>,
    counters: Counters,
    started_at: SystemTime,
    finished_at: SystemTime,
    elapsed: Duration,
    status: RunStatus,
    abort_cause: Option<AbortCause>,
}

impl RunReport {
    pub fn new(
        results: Vec<TargetResult>,
        counters: Counters,
        started_at: SystemTime,
        elapsed: Duration,
        status: RunStatus,
        abort_cause: Option<AbortCause>,
    ) -> Self {
        Self {
            results,
            counters,
            started_at,
            finished_at: started_at + elapsed,
            elapsed,
            status,
            abort_cause,
        }
    }

    /// Results in inventory order, then protocol order.
    pub fn results(&self) -> &[TargetResult] {
        &self.results
    }

    pub fn result(&self, address: &str, protocol: &ProtocolId) -> Option<&TargetResult> {
        self.results
            .iter()
            .find(|result| result.target().key() == (address, protocol))
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn started_at(&self) -> SystemTime {
        self.started_at
    }

    pub fn finished_at(&self) -> SystemTime {
        self.finished_at
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn status(&self) -> RunStatus {
        self.status
    }

    pub fn abort_cause(&self) -> Option<AbortCause> {
        self.abort_cause
    }
}
