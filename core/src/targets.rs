use std::collections::HashSet;
use std::sync::Arc;

use multiping_common::{AttemptBudget, ConfigurationError, Host, ProtocolSpec, Target};

use crate::registry::Registry;

/// Builds the cross product of `hosts` and `protocols`, hosts outer and
/// protocols inner. Target indices follow that order.
///
/// Every protocol must be registered and accept its options, and neither a
/// host nor a protocol may appear twice. An empty host list yields no
/// targets.
pub fn expand(
    hosts: &[Host],
    protocols: &[ProtocolSpec],
    registry: &Registry,
    budget: AttemptBudget,
) -> Result<Vec<Target>, ConfigurationError> {
    if protocols.is_empty() {
        return Err(ConfigurationError::NoProtocols);
    }

    let mut seen_protocols = HashSet::new();
    let mut specs = Vec::with_capacity(protocols.len());
    for spec in protocols {
        let prober = registry.resolve(spec.id())?;
        if !seen_protocols.insert(spec.id().clone()) {
            return Err(ConfigurationError::DuplicateProtocol(spec.id().clone()));
        }
        prober
            .validate(spec)
            .map_err(|reason| ConfigurationError::InvalidOption {
                protocol: spec.id().clone(),
                reason,
            })?;
        specs.push((Arc::new(spec.clone()), budget.for_spec(spec)));
    }

    let mut seen_hosts = HashSet::new();
    let mut targets = Vec::with_capacity(hosts.len() * specs.len());
    for host in hosts {
        if !seen_hosts.insert(host.address().to_ascii_lowercase()) {
            return Err(ConfigurationError::DuplicateHost(host.address().to_string()));
        }
        let host = Arc::new(host.clone());
        for (spec, budget) in &specs {
            targets.push(Target::new(
                targets.len(),
                Arc::clone(&host),
                Arc::clone(spec),
                budget.timeout,
                budget.retries,
            ));
        }
    }

    Ok(targets)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
