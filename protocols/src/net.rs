use std::io::{self, ErrorKind};
use std::net::{IpAddr, SocketAddr};

use multiping_common::{FailureKind, ProbeOutcome, ProtocolSpec};
use tokio::net::TcpStream;

pub(crate) const PORT_KEY: &str = "port";

/// Maps socket errors onto the failure taxonomy.
pub(crate) fn classify(err: &io::Error) -> FailureKind {
    match err.kind() {
        ErrorKind::ConnectionRefused | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted => {
            FailureKind::ConnectionRefused
        }
        ErrorKind::NetworkUnreachable
        | ErrorKind::HostUnreachable
        | ErrorKind::NetworkDown
        | ErrorKind::AddrNotAvailable
        | ErrorKind::TimedOut => FailureKind::NetworkUnreachable,
        _ => FailureKind::Other,
    }
}

pub(crate) fn failure(err: &io::Error) -> ProbeOutcome {
    ProbeOutcome::failure(classify(err), err.to_string())
}

/// Resolves `address` afresh. Literal IPs skip the resolver.
pub(crate) async fn resolve(address: &str, port: u16) -> Result<Vec<SocketAddr>, ProbeOutcome> {
    if let Ok(ip) = address.parse::<IpAddr>() {
        return Ok(vec![SocketAddr::new(ip, port)]);
    }

    match tokio::net::lookup_host((address, port)).await {
        Ok(addrs) => {
            let addrs: Vec<SocketAddr> = addrs.collect();
            if addrs.is_empty() {
                Err(ProbeOutcome::failure(
                    FailureKind::ResolutionFailed,
                    format!("{address} has no addresses"),
                ))
            } else {
                Ok(addrs)
            }
        }
        Err(err) => Err(ProbeOutcome::failure(
            FailureKind::ResolutionFailed,
            format!("failed to resolve {address}: {err}"),
        )),
    }
}

/// Connects to the first address that accepts, reporting the last error.
pub(crate) async fn connect(addrs: &[SocketAddr]) -> io::Result<TcpStream> {
    let mut last_err = io::Error::new(ErrorKind::AddrNotAvailable, "no address to connect to");
    for addr in addrs {
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(err) => last_err = err,
        }
    }
    Err(last_err)
}

pub(crate) fn port_option(spec: &ProtocolSpec, default: u16) -> Result<u16, String> {
    match spec.option(PORT_KEY) {
        None => Ok(default),
        Some(raw) => match raw.parse::<u16>() {
            Ok(0) => Err("port must be between 1 and 65535".to_string()),
            Ok(port) => Ok(port),
            Err(e) => Err(format!("invalid port '{raw}': {e}")),
        },
    }
}

pub(crate) fn reject_unknown_options(spec: &ProtocolSpec, allowed: &[&str]) -> Result<(), String> {
    match spec.options().keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(format!("unsupported option '{key}'")),
        None => Ok(()),
    }
}
