//! ICMP echo through the system `ping` utility.
//!
//! Raw ICMP sockets need elevated privileges on most systems; the setuid or
//! capability-enabled `ping` binary does not.

pub mod output;

use std::io::ErrorKind;
use std::process::Stdio;

use async_trait::async_trait;
use multiping_common::{FailureKind, ProbeOutcome, Prober, ProtocolId, ProtocolSpec, Target};
use tokio::process::Command;
use tokio::time::{Instant, timeout_at};
use tracing::debug;

pub const PROTOCOL: &str = "icmp";
pub const DEFAULT_PROGRAM: &str = "ping";

#[derive(Debug, Clone)]
pub struct IcmpProber {
    program: String,
}

impl Default for IcmpProber {
    fn default() -> Self {
        Self::new()
    }
}

impl IcmpProber {
    pub fn new() -> Self {
        Self {
            program: DEFAULT_PROGRAM.to_string(),
        }
    }

    /// Uses another `ping`-compatible executable.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Prober for IcmpProber {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::new(PROTOCOL)
    }

    fn validate(&self, spec: &ProtocolSpec) -> Result<(), String> {
        match spec.options().keys().next() {
            Some(key) => Err(format!("unsupported option '{key}'")),
            None => Ok(()),
        }
    }

    async fn attempt(&self, target: &Target, deadline: Instant) -> ProbeOutcome {
        let address = target.host().address();
        if address.starts_with('-') {
            return ProbeOutcome::failure(FailureKind::Other, format!("refusing address '{address}'"));
        }

        let started = Instant::now();
        if started >= deadline {
            return ProbeOutcome::Timeout;
        }

        let Some(args) = output::command_args(std::env::consts::OS, address, deadline - started) else {
            return ProbeOutcome::failure(
                FailureKind::Other,
                format!("unsupported operating system '{}'", std::env::consts::OS),
            );
        };

        let child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(child) => child,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return ProbeOutcome::failure(
                    FailureKind::Other,
                    format!("'{}' command not found", self.program),
                );
            }
            Err(err) => {
                return ProbeOutcome::failure(
                    FailureKind::Other,
                    format!("failed to run '{}': {err}", self.program),
                );
            }
        };

        // Dropping the future on timeout kills the child.
        let output = match timeout_at(deadline, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => {
                return ProbeOutcome::failure(
                    FailureKind::Other,
                    format!("failed to read '{}' output: {err}", self.program),
                );
            }
            Err(_elapsed) => return ProbeOutcome::Timeout,
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!(
            "{} {} exited with {:?}",
            self.program,
            address,
            output.status.code()
        );

        output::interpret(output.status.success(), &stdout, &stderr, started.elapsed())
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
