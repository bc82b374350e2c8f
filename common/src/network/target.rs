//! # Probe Target Model
//!
//! A [`Target`] is one unit of probing work: a host paired with one enabled
//! protocol and the attempt budget that applies to it. Targets are produced by
//! expanding the inventory against the enabled protocols and are identified by
//! `(host address, protocol id)` within one run.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::network::host::Host;
use crate::network::protocol::{ProtocolId, ProtocolSpec};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    index: usize,
    host: Arc<Host>,
    spec: Arc<ProtocolSpec>,
    timeout: Duration,
    retries: u32,
}

impl Target {
    /// `index` is the submission position; results are reported in that order.
    pub fn new(
        index: usize,
        host: Arc<Host>,
        spec: Arc<ProtocolSpec>,
        timeout: Duration,
        retries: u32,
    ) -> Self {
        Self {
            index,
            host,
            spec,
            timeout,
            retries,
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn host(&self) -> &Host {
        &self.host
    }

    pub fn spec(&self) -> &ProtocolSpec {
        &self.spec
    }

    pub fn protocol(&self) -> &ProtocolId {
        self.spec.id()
    }

    /// Effective per-attempt timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Effective retry budget; a target gets at most `retries + 1` attempts.
    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn max_attempts(&self) -> usize {
        self.retries as usize + 1
    }

    pub fn key(&self) -> (&str, &ProtocolId) {
        (self.host.address(), self.spec.id())
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.host.address(), self.spec.id())
    }
}
