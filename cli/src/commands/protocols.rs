use multiping_core::Registry;

use crate::terminal::print::{self, GLOBAL_KEY_WIDTH};

fn describe(id: &str) -> &'static str {
    match id {
        "icmp" => "echo request via the system ping utility",
        "http" => "HEAD request; options: port (80), path (/), host",
        "tcp" => "TCP handshake; options: port (443)",
        _ => "custom prober",
    }
}

pub fn list(registry: &Registry, q_level: u8) {
    print::header("protocols", q_level);

    let width = registry
        .list_enabled()
        .iter()
        .map(|id| id.as_str().len())
        .max()
        .unwrap_or(0);
    GLOBAL_KEY_WIDTH.set(width);

    for id in registry.list_enabled() {
        print::aligned_line(id.as_str(), describe(id.as_str()));
    }
    print::print_status("every protocol also accepts timeout=<ms> and retries=<n>");
}
