use std::sync::Arc;

use colored::*;
use indicatif::ProgressStyle;
use multiping_core::{Progress, ProgressCallback};
use tracing::{Span, info_span};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::terminal::colors;

const TICKS: &[&str] = &[
    "▁▁▁▁▁",
    "▁▂▂▂▁",
    "▁▄▂▄▁",
    "▂▄▆▄▂",
    "▄▆█▆▄",
    "▂▄▆▄▂",
    "▁▄▂▄▁",
    "▁▂▂▂▁",
];

pub const STOP_TIP: &str = "press 'q' to stop early";

pub fn progress_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

fn counting_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.blue} [{pos}/{len}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS)
}

/// Span that carries the run's progress bar. Instrument the run with it.
pub fn run_span(total: usize, interactive: bool) -> Span {
    let span = info_span!("probe", indicatif.pb_show = true);
    span.pb_set_style(&counting_style());
    span.pb_set_length(total as u64);

    let message = if interactive {
        format!("probing targets, {}", STOP_TIP.italic())
    } else {
        "probing targets".to_string()
    };
    span.pb_set_message(&message);
    span
}

/// Progress observer that moves the span's bar as results arrive.
pub fn progress_reporter(span: Span) -> ProgressCallback {
    Arc::new(move |progress: Progress| {
        span.pb_set_position(progress.resolved as u64);
        span.pb_set_message(&progress_message(&progress));
    })
}

fn progress_message(progress: &Progress) -> String {
    let counters = progress.counters;
    format!(
        "{} reachable, {} unreachable, {} errored",
        counters.reachable.to_string().color(colors::REACHABLE).bold(),
        counters.unreachable.to_string().color(colors::UNREACHABLE).bold(),
        counters.errored.to_string().color(colors::ERRORED).bold(),
    )
    .color(colors::TEXT_DEFAULT)
    .to_string()
}
