use std::path::Path;

use anyhow::Context;
use colored::*;
use multiping_common::inventory::{DEFAULT_INVENTORY_FILE, Inventory};
use multiping_common::{ConfigurationError, Host, RunReport, RunStatus};
use multiping_core::{Engine, Registry};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, info, warn};

use crate::commands::ProbeArgs;
use crate::mprint;
use crate::terminal::input::KeyListener;
use crate::terminal::{colors, format, print, spinner};

/// Probes the requested hosts and prints the report. Errors are raised only
/// before probing starts.
pub async fn probe(args: ProbeArgs, q_level: u8) -> anyhow::Result<RunStatus> {
    let hosts = load_hosts(&args)?;
    let config = args.run_config();

    let token = CancellationToken::new();
    watch_ctrl_c(token.clone());
    let listener = if args.no_input {
        None
    } else {
        KeyListener::spawn(token.clone())
    };

    let total = hosts.len() * config.enabled_protocols.len();
    let span = spinner::run_span(total, listener.is_some());
    let engine = Engine::new(Registry::with_defaults())
        .with_cancellation(token)
        .with_progress(spinner::progress_reporter(span.clone()));

    print::header("probing", q_level);
    let report = engine.run(&hosts, &config).instrument(span).await;
    drop(listener);

    let report = report?;
    print_report(&report, q_level);
    Ok(report.status())
}

fn load_hosts(args: &ProbeArgs) -> anyhow::Result<Vec<Host>> {
    let mut inventory = Inventory::new();
    inventory.extend_from_args(&args.hosts)?;

    if let Some(path) = &args.file {
        inventory.load(path)?;
    }

    if args.hosts.is_empty() && args.file.is_none() {
        let fallback = Path::new(DEFAULT_INVENTORY_FILE);
        if fallback.is_file() {
            info!("no hosts given, reading {DEFAULT_INVENTORY_FILE}");
            inventory
                .load(fallback)
                .with_context(|| format!("failed to use {DEFAULT_INVENTORY_FILE}"))?;
        }
    }

    if inventory.is_empty() {
        return Err(ConfigurationError::EmptyInventory.into());
    }
    Ok(inventory.into_hosts())
}

fn watch_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_ok() {
                    warn!("interrupted, stopping");
                    token.cancel();
                }
            }
            _ = token.cancelled() => {}
        }
    });
}

fn print_report(report: &RunReport, q_level: u8) {
    match q_level {
        0 => {
            print::header("results", q_level);
            for (idx, result) in report.results().iter().enumerate() {
                let target = result.target();
                print::tree_head(idx, &format!("{} / {}", target.host(), target.protocol()));
                print::as_tree_one_level(format::result_details(result));
                if idx + 1 != report.results().len() {
                    mprint!();
                }
            }
        }
        1 => {
            for result in report.results() {
                print::print_status(format::result_line(result));
            }
        }
        _ => {}
    }

    print_summary(report, q_level);
}

fn print_summary(report: &RunReport, q_level: u8) {
    let counters = report.counters();
    let total_time: ColoredString = format!("{:.2}s", report.elapsed().as_secs_f64()).bold().yellow();
    let counts = format!(
        "{} reachable, {} unreachable, {} errored of {}",
        counters.reachable.to_string().color(colors::REACHABLE).bold(),
        counters.unreachable.to_string().color(colors::UNREACHABLE).bold(),
        counters.errored.to_string().color(colors::ERRORED).bold(),
        counters.total
    );
    let status = format::status(report.status(), report.abort_cause());
    let output = format!("{counts} in {total_time}: {status}").color(colors::TEXT_DEFAULT);

    match q_level {
        0 => {
            print::fat_separator();
            print::centerln(&output.to_string());
        }
        _ => {
            mprint!();
            print::print_status(output.to_string());
        }
    }
}
