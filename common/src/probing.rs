//! The **port** every protocol strategy implements.
//!
//! A prober performs exactly one attempt against one target and reports what
//! happened as data. Retrying, scheduling and timeouts beyond the single
//! attempt belong to the dispatcher; a prober only has to honor the deadline
//! it is handed.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::network::protocol::{ProtocolId, ProtocolSpec};
use crate::network::target::Target;

#[async_trait]
pub trait Prober: Send + Sync {
    /// Identifier the registry files this prober under.
    fn protocol(&self) -> ProtocolId;

    /// Checks protocol-specific options before any work starts.
    fn validate(&self, _spec: &ProtocolSpec) -> Result<(), String> {
        Ok(())
    }

    /// Runs one attempt. Must return no later than `deadline`, reporting
    /// [`ProbeOutcome::Timeout`] when the operation could not finish in time,
    /// and must report network trouble as [`ProbeOutcome::Failure`].
    async fn attempt(&self, target: &Target, deadline: Instant) -> ProbeOutcome;
}

/// Why an attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    NetworkUnreachable,
    ConnectionRefused,
    ResolutionFailed,
    /// The peer answered with something the prober could not understand.
    ProtocolError,
    Other,
}

impl FailureKind {
    /// Kinds that point at the prober or its configuration rather than at
    /// the remote host.
    pub fn is_client_defect(self) -> bool {
        matches!(self, FailureKind::ProtocolError | FailureKind::Other)
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            FailureKind::NetworkUnreachable => "network unreachable",
            FailureKind::ConnectionRefused => "connection refused",
            FailureKind::ResolutionFailed => "resolution failed",
            FailureKind::ProtocolError => "protocol error",
            FailureKind::Other => "error",
        };
        f.write_str(text)
    }
}

/// Result of a single attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Success { latency: Duration, detail: String },
    Failure { kind: FailureKind, message: String },
    Timeout,
}

impl ProbeOutcome {
    pub fn success(latency: Duration, detail: impl Into<String>) -> Self {
        ProbeOutcome::Success {
            latency,
            detail: detail.into(),
        }
    }

    pub fn failure(kind: FailureKind, message: impl Into<String>) -> Self {
        ProbeOutcome::Failure {
            kind,
            message: message.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, ProbeOutcome::Success { .. })
    }

    pub fn latency(&self) -> Option<Duration> {
        match self {
            ProbeOutcome::Success { latency, .. } => Some(*latency),
            _ => None,
        }
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            ProbeOutcome::Failure { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl fmt::Display for ProbeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbeOutcome::Success { latency, detail } if detail.is_empty() => {
                write!(f, "ok in {:.1}ms", latency.as_secs_f64() * 1000.0)
            }
            ProbeOutcome::Success { latency, detail } => {
                write!(f, "ok in {:.1}ms ({detail})", latency.as_secs_f64() * 1000.0)
            }
            ProbeOutcome::Failure { kind, message } => write!(f, "{kind}: {message}"),
            ProbeOutcome::Timeout => f.write_str("timed out"),
        }
    }
}
