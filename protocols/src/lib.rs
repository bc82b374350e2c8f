//! Reference [`Prober`](multiping_common::Prober) implementations.
//!
//! * [`icmp`]: echo request through the system `ping` utility.
//! * [`http`]: lightweight `HEAD` request, any well-formed response counts.
//! * [`tcp`]: plain TCP handshake.
//!
//! Every prober re-resolves the host name on each attempt, so a retry never
//! reuses an address that may have gone stale.

pub mod http;
pub mod icmp;
pub mod tcp;

mod net;

pub use http::HttpProber;
pub use icmp::IcmpProber;
pub use tcp::TcpProber;
