//! HTTP reachability by `HEAD` request.
//!
//! Any well-formed response counts as reachable, `503` included: the host
//! answered. Latency runs from the start of the attempt until the response
//! head has been parsed.

use std::error::Error as _;
use std::io;
use std::net::IpAddr;

use async_trait::async_trait;
use hyper::client::conn;
use hyper::header::{CONNECTION, HOST, HeaderValue, USER_AGENT};
use hyper::http::uri::PathAndQuery;
use hyper::{Body, Method, Request, Response};
use multiping_common::{FailureKind, ProbeOutcome, Prober, ProtocolId, ProtocolSpec, Target};
use tokio::time::{Instant, timeout_at};
use tracing::debug;

use crate::net;

pub const PROTOCOL: &str = "http";
pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_PATH: &str = "/";

const PATH_KEY: &str = "path";
const HOST_KEY: &str = "host";
const AGENT: &str = concat!("multiping/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Clone, Default)]
pub struct HttpProber;

impl HttpProber {
    pub fn new() -> Self {
        Self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct RequestOptions {
    port: u16,
    path: PathAndQuery,
    host_header: Option<HeaderValue>,
}

impl RequestOptions {
    fn from_spec(spec: &ProtocolSpec) -> Result<Self, String> {
        net::reject_unknown_options(spec, &[net::PORT_KEY, PATH_KEY, HOST_KEY])?;
        let port = net::port_option(spec, DEFAULT_PORT)?;

        let raw_path = spec.option(PATH_KEY).unwrap_or(DEFAULT_PATH);
        if !raw_path.starts_with('/') {
            return Err(format!("path '{raw_path}' must start with '/'"));
        }
        let path = raw_path
            .parse::<PathAndQuery>()
            .map_err(|e| format!("invalid path '{raw_path}': {e}"))?;

        let host_header = spec
            .option(HOST_KEY)
            .map(|host| {
                HeaderValue::from_str(host).map_err(|e| format!("invalid host '{}': {e}", host.escape_debug()))
            })
            .transpose()?;

        Ok(Self {
            port,
            path,
            host_header,
        })
    }
}

#[async_trait]
impl Prober for HttpProber {
    fn protocol(&self) -> ProtocolId {
        ProtocolId::new(PROTOCOL)
    }

    fn validate(&self, spec: &ProtocolSpec) -> Result<(), String> {
        RequestOptions::from_spec(spec).map(|_| ())
    }

    async fn attempt(&self, target: &Target, deadline: Instant) -> ProbeOutcome {
        let options = match RequestOptions::from_spec(target.spec()) {
            Ok(options) => options,
            Err(reason) => return ProbeOutcome::failure(FailureKind::Other, reason),
        };
        if Instant::now() >= deadline {
            return ProbeOutcome::Timeout;
        }

        debug!("HEAD {} against {}", options.path, target);
        match timeout_at(deadline, head(target.host().address(), &options)).await {
            Ok(outcome) => outcome,
            Err(_elapsed) => ProbeOutcome::Timeout,
        }
    }
}

async fn head(address: &str, options: &RequestOptions) -> ProbeOutcome {
    let started = Instant::now();

    let addrs = match net::resolve(address, options.port).await {
        Ok(addrs) => addrs,
        Err(outcome) => return outcome,
    };
    let stream = match net::connect(&addrs).await {
        Ok(stream) => stream,
        Err(err) => return net::failure(&err),
    };

    let request = match build_request(address, options) {
        Ok(request) => request,
        Err(reason) => return ProbeOutcome::failure(FailureKind::Other, reason),
    };

    let (mut sender, connection) = match conn::Builder::new()
        .http1_title_case_headers(true)
        .handshake::<_, Body>(stream)
        .await
    {
        Ok(parts) => parts,
        Err(err) => return exchange_failure(&err),
    };

    // The connection is driven here rather than on its own task, so a
    // timed-out attempt drops the socket with it.
    let exchange = sender.send_request(request);
    tokio::pin!(exchange);
    tokio::pin!(connection);

    let response = tokio::select! {
        biased;
        response = &mut exchange => response,
        closed = &mut connection => match closed {
            Ok(()) => exchange.await,
            Err(err) => Err(err),
        },
    };

    match response {
        Ok(response) => ProbeOutcome::success(started.elapsed(), status_line(&response)),
        Err(err) => exchange_failure(&err),
    }
}

fn host_value(address: &str, options: &RequestOptions) -> Result<HeaderValue, String> {
    if let Some(host) = &options.host_header {
        return Ok(host.clone());
    }

    let name = match address.parse::<IpAddr>() {
        Ok(IpAddr::V6(v6)) => format!("[{v6}]"),
        _ => address.to_string(),
    };
    let host = if options.port == DEFAULT_PORT {
        name
    } else {
        format!("{name}:{}", options.port)
    };
    HeaderValue::from_str(&host).map_err(|e| format!("invalid host '{host}': {e}"))
}

fn build_request(address: &str, options: &RequestOptions) -> Result<Request<Body>, String> {
    Request::builder()
        .method(Method::HEAD)
        .uri(options.path.as_str())
        .header(HOST, host_value(address, options)?)
        .header(USER_AGENT, AGENT)
        .header(CONNECTION, "close")
        .body(Body::empty())
        .map_err(|e| format!("invalid request: {e}"))
}

fn status_line(response: &Response<Body>) -> String {
    format!("{:?} {}", response.version(), response.status())
}

/// A reply that is not HTTP, or no reply at all, is a protocol error; socket
/// errors keep their usual mapping.
fn exchange_failure(err: &hyper::Error) -> ProbeOutcome {
    let kind = if err.is_parse() || err.is_incomplete_message() || err.is_canceled() {
        FailureKind::ProtocolError
    } else if let Some(io_err) = err.source().and_then(|source| source.downcast_ref::<io::Error>()) {
        net::classify(io_err)
    } else {
        FailureKind::Other
    };
    ProbeOutcome::failure(kind, err.to_string())
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
