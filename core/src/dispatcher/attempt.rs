use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

use multiping_common::{FailureKind, ProbeOutcome, Prober, Target};
use tokio::task::JoinError;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, warn};

/// One attempt, run on its own task. A prober that is still busy
/// `grace` after its deadline is dropped and the attempt counts as a timeout.
pub(super) async fn run(
    prober: Arc<dyn Prober>,
    target: Target,
    deadline: Instant,
    grace: Duration,
) -> ProbeOutcome {
    match timeout_at(deadline + grace, prober.attempt(&target, deadline)).await {
        Ok(outcome) => {
            debug!("{target}: {outcome}");
            outcome
        }
        Err(_elapsed) => {
            warn!("{target}: prober ignored its deadline, attempt abandoned");
            ProbeOutcome::Timeout
        }
    }
}

/// Outcome of a joined attempt task. Panics become `Failure{Other}`.
pub(super) fn outcome(target: &Target, joined: Result<ProbeOutcome, JoinError>) -> ProbeOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(err) if err.is_panic() => {
            let message = panic_message(err.into_panic());
            warn!("{target}: prober panicked: {message}");
            ProbeOutcome::failure(FailureKind::Other, format!("prober panicked: {message}"))
        }
        Err(err) => ProbeOutcome::failure(FailureKind::Other, format!("attempt cancelled: {err}")),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(text) = payload.downcast_ref::<&str>() {
        text.to_string()
    } else if let Some(text) = payload.downcast_ref::<String>() {
        text.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
