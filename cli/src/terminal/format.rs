use std::time::Duration;

use colored::*;
use multiping_common::{AbortCause, Classification, ProbeOutcome, RunStatus, TargetResult};

use crate::terminal::colors;

type Detail = (String, ColoredString);

pub fn classification(classification: Classification) -> ColoredString {
    match classification {
        Classification::Reachable => "reachable".color(colors::REACHABLE).bold(),
        Classification::Unreachable => "unreachable".color(colors::UNREACHABLE).bold(),
        Classification::Errored => "errored".color(colors::ERRORED).bold(),
    }
}

pub fn latency(latency: Duration) -> ColoredString {
    format!("{:.1}ms", latency.as_secs_f64() * 1000.0).color(colors::LATENCY)
}

pub fn outcome(outcome: &ProbeOutcome) -> ColoredString {
    match outcome {
        ProbeOutcome::Success { detail, .. } if detail.is_empty() => "ok".normal(),
        ProbeOutcome::Success { detail, .. } => detail.normal(),
        ProbeOutcome::Failure { kind, message } => format!("{kind}: {message}").red(),
        ProbeOutcome::Timeout => "timed out".yellow(),
    }
}

pub fn status(status: RunStatus, cause: Option<AbortCause>) -> ColoredString {
    match (status, cause) {
        (RunStatus::Completed, _) => "completed".green().bold(),
        (RunStatus::CompletedWithFailures, _) => "completed with failures".yellow().bold(),
        (RunStatus::Aborted, Some(AbortCause::Cancelled)) => "aborted (cancelled)".red().bold(),
        (RunStatus::Aborted, Some(AbortCause::DeadlineElapsed)) => {
            "aborted (deadline elapsed)".red().bold()
        }
        (RunStatus::Aborted, None) => "aborted".red().bold(),
    }
}

/// Tree rows describing one target.
pub fn result_details(result: &TargetResult) -> Vec<Detail> {
    let mut details: Vec<Detail> = vec![(
        "Status".to_string(),
        classification(result.classification()),
    )];

    let attempts = format!("{}/{}", result.attempts().len(), result.target().max_attempts());
    let attempts = if result.is_abandoned() {
        format!("{attempts} (abandoned)").yellow()
    } else {
        attempts.normal()
    };
    details.push(("Tries".to_string(), attempts));

    if let Some(value) = result.latency() {
        details.push(("Latency".to_string(), latency(value)));
    }

    if let Some(last) = result.final_outcome() {
        details.push(("Outcome".to_string(), outcome(last)));
    }

    details
}

/// Single-line form used at the first quiet level.
pub fn result_line(result: &TargetResult) -> String {
    let target = result.target();
    let timing = match result.latency() {
        Some(value) => format!(" {}", latency(value)),
        None => String::new(),
    };
    format!(
        "{} {} {}{}",
        target.host().address().color(colors::PRIMARY),
        target.protocol().as_str().color(colors::SECONDARY),
        classification(result.classification()),
        timing
    )
}
