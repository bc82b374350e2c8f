use std::time::Duration;

use async_trait::async_trait;
use multiping_common::{FailureKind, ProbeOutcome, Prober, ProtocolId, ProtocolSpec, Target};
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::net;

pub const PROTOCOL: &str = "tcp";
pub const DEFAULT_PORT: u16 = 443;

/// Reachability by TCP handshake. Latency is the connect time.
#[derive(Debug, Clone, Default)]
pub struct TcpProber;

impl TcpProber {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Prober for TcpProber {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::new(PROTOCOL)
    }

    fn validate(&self, spec: &ProtocolSpec) -> Result<(), String> {
        net::reject_unknown_options(spec, &[net::PORT_KEY])?;
        net::port_option(spec, DEFAULT_PORT).map(|_| ())
    }

    async fn attempt(&self, target: &Target, deadline: Instant) -> ProbeOutcome {
        let port = match net::port_option(target.spec(), DEFAULT_PORT) {
            Ok(port) => port,
            Err(reason) => return ProbeOutcome::failure(FailureKind::Other, reason),
        };
        if Instant::now() >= deadline {
            return ProbeOutcome::Timeout;
        }

        let started = Instant::now();
        match timeout_at(deadline, handshake(target.host().address(), port)).await {
            Ok(Ok((peer, latency))) => {
                debug!("handshake with {peer} completed in {latency:?}");
                ProbeOutcome::success(latency, format!("connected to {peer}"))
            }
            Ok(Err(outcome)) => outcome,
            Err(_elapsed) => {
                debug!("handshake with {target} timed out after {:?}", started.elapsed());
                ProbeOutcome::Timeout
            }
        }
    }
}

async fn handshake(address: &str, port: u16) -> Result<(std::net::SocketAddr, Duration), ProbeOutcome> {
    let started = Instant::now();
    let addrs = net::resolve(address, port).await?;
    let stream = net::connect(&addrs).await.map_err(|err| net::failure(&err))?;
    let peer = stream.peer_addr().map_err(|err| net::failure(&err))?;
    Ok((peer, started.elapsed()))
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
