//! Building `ping` command lines and reading their output.
//!
//! The flags and the wording of replies differ per platform; everything that
//! depends on them lives here so [`super::IcmpProber`] stays platform-neutral.

use std::time::Duration;

use multiping_common::{FailureKind, ProbeOutcome};

/// Arguments for a single echo request to `address`, waiting at most `wait`.
/// `None` when the platform's `ping` flags are unknown.
pub fn command_args(os: &str, address: &str, wait: Duration) -> Option<Vec<String>> {
    let millis = wait.as_millis().max(1);
    match os {
        "linux" | "android" | "freebsd" | "openbsd" | "netbsd" => {
            let secs = wait.as_secs() + u64::from(wait.subsec_nanos() > 0);
            Some(vec![
                "-n".into(),
                "-c".into(),
                "1".into(),
                "-W".into(),
                secs.max(1).to_string(),
                address.into(),
            ])
        }
        "macos" | "ios" => Some(vec![
            "-n".into(),
            "-c".into(),
            "1".into(),
            "-W".into(),
            millis.to_string(),
            address.into(),
        ]),
        "windows" => Some(vec![
            "-n".into(),
            "1".into(),
            "-w".into(),
            millis.to_string(),
            address.into(),
        ]),
        _ => None,
    }
}

/// Extracts the round-trip time from a reply, e.g. `time=12.3 ms`,
/// `time<1ms` or the Windows summary `Average = 4ms`.
pub fn parse_latency(stdout: &str) -> Option<Duration> {
    for line in stdout.lines() {
        let lower = line.to_ascii_lowercase();
        for marker in ["time=", "time<", "average = "] {
            if let Some(pos) = lower.find(marker) {
                let rest = &lower[pos + marker.len()..];
                if let Some(ms) = leading_millis(rest) {
                    return Some(Duration::from_micros((ms * 1000.0).round() as u64));
                }
            }
        }
    }
    None
}

fn leading_millis(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let end = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, unit) = text.split_at(end);
    if !unit.trim_start().starts_with("ms") {
        return None;
    }
    number.parse::<f64>().ok().filter(|ms| ms.is_finite() && *ms >= 0.0)
}

const RESOLUTION_PATTERNS: &[&str] = &[
    "unknown host",
    "name or service not known",
    "cannot resolve",
    "could not find host",
    "temporary failure in name resolution",
    "no address associated",
    "nodename nor servname",
];

const UNREACHABLE_PATTERNS: &[&str] = &["unreachable", "no route to host"];

const PERMISSION_PATTERNS: &[&str] = &["operation not permitted", "permission denied"];

/// Turns a finished `ping` run into an outcome. `elapsed` stands in for the
/// latency when the reply carries no timing.
pub fn interpret(
    success: bool,
    stdout: &str,
    stderr: &str,
    elapsed: Duration,
) -> ProbeOutcome {
    let out = stdout.to_ascii_lowercase();
    let err = stderr.to_ascii_lowercase();

    if success {
        // Windows reports "Destination host unreachable" with a zero exit code.
        if contains_any(&out, UNREACHABLE_PATTERNS) && !out.contains("bytes from") {
            return ProbeOutcome::failure(FailureKind::NetworkUnreachable, first_line(stdout));
        }
        let latency = parse_latency(stdout).unwrap_or(elapsed);
        return ProbeOutcome::success(latency, reply_line(stdout));
    }

    let text = format!("{out}\n{err}");
    let message = if stderr.trim().is_empty() {
        first_line(stdout)
    } else {
        first_line(stderr)
    };

    if contains_any(&text, RESOLUTION_PATTERNS) {
        ProbeOutcome::failure(FailureKind::ResolutionFailed, message)
    } else if contains_any(&text, UNREACHABLE_PATTERNS) {
        ProbeOutcome::failure(FailureKind::NetworkUnreachable, message)
    } else if contains_any(&text, PERMISSION_PATTERNS) {
        ProbeOutcome::failure(FailureKind::Other, message)
    } else if err.trim().is_empty() {
        // No reply within the wait window.
        ProbeOutcome::Timeout
    } else {
        ProbeOutcome::failure(FailureKind::Other, message)
    }
}

fn contains_any(text: &str, patterns: &[&str]) -> bool {
    patterns.iter().any(|p| text.contains(p))
}

fn first_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .unwrap_or("")
        .to_string()
}

fn reply_line(stdout: &str) -> String {
    stdout
        .lines()
        .map(str::trim)
        .find(|line| {
            let lower = line.to_ascii_lowercase();
            lower.contains("bytes from") || lower.contains("reply from") || lower.contains("echo reply")
        })
        .unwrap_or("")
        .to_string()
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
