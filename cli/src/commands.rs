pub mod probe;
pub mod protocols;

use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand};
use multiping_common::config::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT, DEFAULT_ABANDON_GRACE};
use multiping_common::{Backoff, ProtocolSpec, RunConfig};

#[derive(Parser, Debug)]
#[command(name = "multiping")]
#[command(version, about = "Probe many hosts over many protocols at once.")]
pub struct CommandLine {
    #[command(subcommand)]
    pub command: Commands,

    /// Reduce output (-q one line per target, -qq summary only)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub quiet: u8,

    /// Show debug logs (-vv for trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Do not print the banner
    #[arg(long, global = true)]
    pub no_banner: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Probe hosts and report their reachability
    #[command(alias = "p")]
    Probe(ProbeArgs),
    /// List the available protocols
    #[command(alias = "ls")]
    Protocols,
}

#[derive(Args, Debug, Clone)]
pub struct ProbeArgs {
    /// Hosts to probe; comma separated lists are accepted
    pub hosts: Vec<String>,

    /// Inventory file, one host per line
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Protocol to probe with, e.g. `icmp` or `tcp:port=22,retries=2` (repeatable)
    #[arg(short, long = "protocol", value_name = "SPEC", default_value = "icmp")]
    pub protocols: Vec<ProtocolSpec>,

    /// Attempts in flight at once
    #[arg(short, long, default_value_t = DEFAULT_CONCURRENCY)]
    pub concurrency: usize,

    /// Per-attempt timeout in milliseconds
    #[arg(short, long = "timeout", value_name = "MS", default_value_t = DEFAULT_TIMEOUT.as_millis() as u64)]
    pub timeout_ms: u64,

    /// Retries after a failed attempt
    #[arg(short, long, default_value_t = 0)]
    pub retries: u32,

    /// Delay between retries: `none`, `<ms>`, `const:<ms>` or `exp:<base>[:<max>]`
    #[arg(short, long, default_value = "500")]
    pub backoff: Backoff,

    /// Stop the whole run after this many milliseconds
    #[arg(short, long = "deadline", value_name = "MS")]
    pub deadline_ms: Option<u64>,

    /// Extra milliseconds an attempt may overrun before it is abandoned
    #[arg(long = "grace", value_name = "MS", default_value_t = DEFAULT_ABANDON_GRACE.as_millis() as u64)]
    pub grace_ms: u64,

    /// Do not listen for 'q' to stop early
    #[arg(long)]
    pub no_input: bool,
}

impl ProbeArgs {
    pub fn run_config(&self) -> RunConfig {
        RunConfig {
            max_concurrency: self.concurrency,
            per_attempt_timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.retries,
            retry_backoff: self.backoff,
            global_deadline: self.deadline_ms.map(Duration::from_millis),
            abandon_grace: Duration::from_millis(self.grace_ms),
            enabled_protocols: self.protocols.clone(),
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
