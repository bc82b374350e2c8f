//! Drives targets through their attempts.
//!
//! A single coordinator owns all scheduling state: the pending table, the
//! [`RetryQueue`](queue::RetryQueue) of targets waiting for a slot, and the set
//! of spawned attempt tasks. Because only the coordinator spawns attempts, the
//! concurrency bound holds by construction: the task set never grows past
//! `max_concurrency`. Every freed slot goes to the lowest submission slot that
//! is ready to run.
//!
//! When the global deadline elapses or the run is cancelled, no further
//! attempt starts. In-flight attempts get `abandon_grace` to report back;
//! whatever is still unresolved after that is abandoned.

mod attempt;
mod queue;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::stream::FuturesUnordered;
use futures::{FutureExt, StreamExt};
use multiping_common::{
    AbortCause, Backoff, FailureKind, ProbeOutcome, Prober, RunConfig, Target, TargetResult,
};
use tokio::sync::mpsc;
use tokio::task::{AbortHandle, JoinError};
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::registry::Registry;
use queue::RetryQueue;

type InFlight = FuturesUnordered<BoxFuture<'static, (usize, Result<ProbeOutcome, JoinError>)>>;

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    /// Targets resolved without their prober's cooperation.
    pub abandoned: usize,
    /// Set when the run was stopped before every target resolved.
    pub cause: Option<AbortCause>,
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Registry,
    max_concurrency: usize,
    backoff: Backoff,
    global_deadline: Option<Duration>,
    abandon_grace: Duration,
    cancel: CancellationToken,
}

impl Dispatcher {
    /// `config` is expected to be validated.
    pub fn new(registry: Registry, config: &RunConfig) -> Self {
        Self {
            registry,
            max_concurrency: config.max_concurrency.max(1),
            backoff: config.retry_backoff,
            global_deadline: config.global_deadline,
            abandon_grace: config.abandon_grace,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Runs every target to resolution, sending exactly one result per target
    /// into `results`. The global deadline starts counting now.
    pub async fn dispatch(
        &self,
        targets: Vec<Target>,
        results: mpsc::Sender<TargetResult>,
    ) -> DispatchSummary {
        let global_deadline = self.global_deadline.map(|limit| Instant::now() + limit);
        let mut table = PendingTable::new(results);

        for target in targets {
            match self.registry.resolve(target.protocol()) {
                Ok(prober) => table.admit(target, prober),
                Err(err) => {
                    warn!("{target}: {err}");
                    let failure = ProbeOutcome::failure(FailureKind::Other, err.to_string());
                    table.emit(TargetResult::resolved(target, vec![failure])).await;
                }
            }
        }

        let mut in_flight = InFlight::new();
        let mut handles: HashMap<usize, AbortHandle> = HashMap::new();
        let mut cause = None;

        while table.unresolved > 0 {
            if let Some(stop) = self.stop_cause(global_deadline) {
                cause = Some(stop);
                break;
            }

            while in_flight.len() < self.max_concurrency {
                let Some(slot) = table.queue.pop_ready() else {
                    break;
                };
                let Some(entry) = table.entry(slot) else {
                    continue;
                };

                let mut deadline = Instant::now() + entry.target.timeout();
                if let Some(global) = global_deadline {
                    deadline = deadline.min(global);
                }
                debug!(
                    "{}: attempt {}/{}",
                    entry.target,
                    entry.attempts.len() + 1,
                    entry.target.max_attempts()
                );

                let handle = tokio::spawn(attempt::run(
                    Arc::clone(&entry.prober),
                    entry.target.clone(),
                    deadline,
                    self.abandon_grace,
                ));
                handles.insert(slot, handle.abort_handle());
                in_flight.push(handle.map(move |joined| (slot, joined)).boxed());
            }

            let event = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => Event::Stop(AbortCause::Cancelled),
                _ = deadline_elapsed(global_deadline) => Event::Stop(AbortCause::DeadlineElapsed),
                Some((slot, joined)) = in_flight.next() => Event::Finished(slot, joined),
                Some(slot) = table.queue.next_expired() => Event::Ready(slot),
            };

            match event {
                Event::Stop(stop) => {
                    cause = Some(stop);
                    break;
                }
                Event::Finished(slot, joined) => {
                    handles.remove(&slot);
                    table.record(slot, joined, Some(&self.backoff)).await;
                }
                Event::Ready(slot) => table.queue.push_ready(slot),
            }
        }

        let Some(cause) = cause else {
            return DispatchSummary::default();
        };

        warn!(
            "run stopped ({cause:?}) with {} attempts in flight and {} targets waiting",
            in_flight.len(),
            table.queue.waiting()
        );

        let drain_until = Instant::now() + self.abandon_grace;
        while !in_flight.is_empty() {
            let finished = tokio::select! {
                next = in_flight.next() => next,
                _ = sleep_until(drain_until) => None,
            };
            let Some((slot, joined)) = finished else {
                break;
            };
            handles.remove(&slot);
            table.record(slot, joined, None).await;
        }

        for handle in handles.values() {
            handle.abort();
        }

        let abandoned = table.abandon_remaining().await;
        DispatchSummary {
            abandoned,
            cause: Some(cause),
        }
    }

    fn stop_cause(&self, global_deadline: Option<Instant>) -> Option<AbortCause> {
        if self.cancel.is_cancelled() {
            Some(AbortCause::Cancelled)
        } else if global_deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            Some(AbortCause::DeadlineElapsed)
        } else {
            None
        }
    }
}

enum Event {
    Stop(AbortCause),
    Finished(usize, Result<ProbeOutcome, JoinError>),
    Ready(usize),
}

async fn deadline_elapsed(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

struct Pending {
    target: Target,
    prober: Arc<dyn Prober>,
    attempts: Vec<ProbeOutcome>,
}

/// Unresolved targets by slot. A slot is emptied exactly once, when its
/// result is sent.
struct PendingTable {
    slots: Vec<Option<Pending>>,
    unresolved: usize,
    queue: RetryQueue,
    results: mpsc::Sender<TargetResult>,
}

impl PendingTable {
    fn new(results: mpsc::Sender<TargetResult>) -> Self {
        Self {
            slots: Vec::new(),
            unresolved: 0,
            queue: RetryQueue::new(),
            results,
        }
    }

    fn admit(&mut self, target: Target, prober: Arc<dyn Prober>) {
        let slot = self.slots.len();
        let max_attempts = target.max_attempts();
        self.slots.push(Some(Pending {
            target,
            prober,
            attempts: Vec::with_capacity(max_attempts),
        }));
        self.unresolved += 1;
        self.queue.push_ready(slot);
    }

    fn entry(&self, slot: usize) -> Option<&Pending> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    /// Records a finished attempt. With a backoff the target is requeued when
    /// it failed and has retries left; without one it is left pending.
    async fn record(
        &mut self,
        slot: usize,
        joined: Result<ProbeOutcome, JoinError>,
        backoff: Option<&Backoff>,
    ) {
        let Some(entry) = self.slots.get_mut(slot).and_then(Option::as_mut) else {
            return;
        };

        let outcome = attempt::outcome(&entry.target, joined);
        let success = outcome.is_success();
        entry.attempts.push(outcome);

        if !success && entry.attempts.len() < entry.target.max_attempts() {
            if let Some(backoff) = backoff {
                let delay = backoff.delay((entry.attempts.len() - 1) as u32);
                debug!("{}: retrying in {delay:?}", entry.target);
                self.queue.schedule(slot, delay);
            }
            return;
        }

        if let Some(entry) = self.slots[slot].take() {
            self.unresolved -= 1;
            self.emit(TargetResult::resolved(entry.target, entry.attempts)).await;
        }
    }

    async fn abandon_remaining(&mut self) -> usize {
        let mut abandoned = 0;
        for slot in 0..self.slots.len() {
            if let Some(entry) = self.slots[slot].take() {
                warn!(
                    "{}: abandoned after {} attempt(s)",
                    entry.target,
                    entry.attempts.len()
                );
                self.unresolved -= 1;
                abandoned += 1;
                self.emit(TargetResult::abandoned(entry.target, entry.attempts)).await;
            }
        }
        abandoned
    }

    async fn emit(&self, result: TargetResult) {
        if self.results.send(result).await.is_err() {
            debug!("result receiver dropped");
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
