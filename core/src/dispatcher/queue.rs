use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::time::Duration;

use futures::StreamExt;
use multiping_common::config::MAX_BACKOFF;
use tokio_util::time::DelayQueue;

/// Targets waiting for a slot. Ready targets leave lowest submission slot
/// first; targets in backoff wait in a timer wheel until they become ready.
pub(super) struct RetryQueue {
    ready: BinaryHeap<Reverse<usize>>,
    backoff: DelayQueue<usize>,
}

impl RetryQueue {
    pub(super) fn new() -> Self {
        Self {
            ready: BinaryHeap::new(),
            backoff: DelayQueue::new(),
        }
    }

    pub(super) fn push_ready(&mut self, slot: usize) {
        self.ready.push(Reverse(slot));
    }

    /// Delays are clamped to [`MAX_BACKOFF`]; the timer wheel cannot hold
    /// much longer ones.
    pub(super) fn schedule(&mut self, slot: usize, delay: Duration) {
        if delay.is_zero() {
            self.push_ready(slot);
        } else {
            self.backoff.insert(slot, delay.min(MAX_BACKOFF));
        }
    }

    pub(super) fn pop_ready(&mut self) -> Option<usize> {
        self.ready.pop().map(|Reverse(slot)| slot)
    }

    /// Resolves when the next backoff elapses; `None` when nothing is waiting.
    pub(super) async fn next_expired(&mut self) -> Option<usize> {
        self.backoff.next().await.map(|expired| expired.into_inner())
    }

    pub(super) fn waiting(&self) -> usize {
        self.ready.len() + self.backoff.len()
    }
}
