#![cfg(test)]
//! Scripted probers and run helpers shared by the integration scenarios.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use multiping_common::{
    FailureKind, Host, ProbeOutcome, Prober, ProtocolId, ProtocolSpec, RunConfig, Target,
};
use multiping_core::{Engine, Registry};
use tokio::time::{Instant, sleep, sleep_until};

/// What a scripted attempt does.
#[derive(Debug, Clone)]
pub enum Step {
    Succeed,
    SucceedAfter(Duration),
    Fail(FailureKind),
    /// Waits for the attempt deadline, then reports a timeout.
    Timeout,
    /// Never returns.
    Hang,
    Panic,
}

#[derive(Debug, Clone)]
pub struct Call {
    pub address: String,
    pub at: Instant,
    pub deadline: Instant,
}

/// Prober that replays a per-host script. The last step of a script repeats
/// once the script runs out.
pub struct ScriptedProber {
    id: ProtocolId,
    default: Step,
    scripts: HashMap<String, Vec<Step>>,
    calls: Mutex<Vec<Call>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProber {
    pub fn new(id: &str) -> Self {
        Self {
            id: ProtocolId::new(id),
            default: Step::Succeed,
            scripts: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn with_default(mut self, step: Step) -> Self {
        self.default = step;
        self
    }

    pub fn script(mut self, address: &str, steps: Vec<Step>) -> Self {
        self.scripts.insert(address.to_string(), steps);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn call_times(&self, address: &str) -> Vec<Instant> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.address == address)
            .map(|call| call.at)
            .collect()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn next_step(&self, address: &str, deadline: Instant) -> Step {
        let mut calls = self.calls.lock().unwrap();
        let previous = calls.iter().filter(|call| call.address == address).count();
        calls.push(Call {
            address: address.to_string(),
            at: Instant::now(),
            deadline,
        });

        match self.scripts.get(address) {
            Some(steps) if !steps.is_empty() => steps[previous.min(steps.len() - 1)].clone(),
            _ => self.default.clone(),
        }
    }
}

struct InFlightGuard<'a>(&'a AtomicUsize);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Prober for ScriptedProber {
    fn protocol(&self) -> ProtocolId {
        self.id.clone()
    }

    async fn attempt(&self, target: &Target, deadline: Instant) -> ProbeOutcome {
        let address = target.host().address();
        let step = self.next_step(address, deadline);

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _guard = InFlightGuard(&self.in_flight);

        match step {
            Step::Succeed => ProbeOutcome::success(Duration::from_millis(1), "scripted"),
            Step::SucceedAfter(delay) => {
                sleep(delay).await;
                ProbeOutcome::success(delay, "scripted")
            }
            Step::Fail(kind) => ProbeOutcome::failure(kind, format!("scripted {kind}")),
            Step::Timeout => {
                sleep_until(deadline).await;
                ProbeOutcome::Timeout
            }
            Step::Hang => std::future::pending().await,
            Step::Panic => panic!("scripted panic on {address}"),
        }
    }
}

pub fn hosts(addresses: &[&str]) -> Vec<Host> {
    addresses.iter().map(|address| Host::new(*address)).collect()
}

/// Config probing only `protocol`, no backoff between retries.
pub fn config(protocol: &str, retries: u32) -> RunConfig {
    RunConfig {
        max_retries: retries,
        retry_backoff: multiping_common::Backoff::None,
        enabled_protocols: vec![ProtocolSpec::new(protocol)],
        ..RunConfig::default()
    }
}

/// Engine whose registry holds only the given probers.
pub fn engine(probers: &[Arc<ScriptedProber>]) -> Engine {
    let mut registry = Registry::new();
    for prober in probers {
        registry.register_arc(prober.clone());
    }
    Engine::new(registry)
}
