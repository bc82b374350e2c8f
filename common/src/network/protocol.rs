//! # Protocol Selection Model
//!
//! Defines which prober runs against a host and how it is tuned.
//!
//! A protocol is written on the command line as `id[:key=value,...]`:
//! * `icmp`
//! * `http:port=8080,path=/health`
//! * `tcp:port=22,timeout=500,retries=2`
//!
//! The keys `timeout` (milliseconds) and `retries` are reserved and override the
//! run-wide attempt budget for this protocol only. Every other key is handed to
//! the prober untouched.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

const TIMEOUT_KEY: &str = "timeout";
const RETRIES_KEY: &str = "retries";

/// Case-insensitive protocol identifier, e.g. `icmp` or `http`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolId(String);

impl ProtocolId {
    pub fn new(id: impl AsRef<str>) -> Self {
        Self(id.as_ref().trim().to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProtocolId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// A protocol enabled for a run, with its overrides and prober options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolSpec {
    id: ProtocolId,
    timeout: Option<Duration>,
    retries: Option<u32>,
    options: BTreeMap<String, String>,
}

impl ProtocolSpec {
    pub fn new(id: impl Into<ProtocolId>) -> Self {
        Self {
            id: id.into(),
            timeout: None,
            retries: None,
            options: BTreeMap::new(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> &ProtocolId {
        &self.id
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn retries(&self) -> Option<u32> {
        self.retries
    }

    pub fn options(&self) -> &BTreeMap<String, String> {
        &self.options
    }

    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

impl From<ProtocolId> for ProtocolSpec {
    fn from(id: ProtocolId) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for ProtocolSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id)?;
        let mut pairs: Vec<String> = self
            .options
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect();
        if let Some(timeout) = self.timeout {
            pairs.push(format!("{TIMEOUT_KEY}={}", timeout.as_millis()));
        }
        if let Some(retries) = self.retries {
            pairs.push(format!("{RETRIES_KEY}={retries}"));
        }
        if !pairs.is_empty() {
            write!(f, ":{}", pairs.join(","))?;
        }
        Ok(())
    }
}

impl FromStr for ProtocolSpec {
    type Err = String;

    /// Parses `id[:key=value,key=value]`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (id_str, options_str) = match s.split_once(':') {
            Some((id, options)) => (id, Some(options)),
            None => (s, None),
        };

        let id = parse_id(id_str)?;
        let mut spec = ProtocolSpec::new(id);

        let Some(options_str) = options_str else {
            return Ok(spec);
        };

        for pair in options_str.split(',') {
            let pair = pair.trim();
            if pair.is_empty() {
                continue;
            }
            let (key, value) = parse_pair(pair)?;
            spec = apply_pair(spec, key, value)?;
        }

        Ok(spec)
    }
}

fn parse_id(s: &str) -> Result<ProtocolId, String> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err("protocol name cannot be empty".to_string());
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(format!("invalid protocol name: {trimmed}"));
    }
    Ok(ProtocolId::new(trimmed))
}

fn parse_pair(pair: &str) -> Result<(&str, &str), String> {
    let Some((key, value)) = pair.split_once('=') else {
        return Err(format!("expected key=value, got '{pair}'"));
    };
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("option key cannot be empty in '{pair}'"));
    }
    Ok((key, value.trim()))
}

fn apply_pair(spec: ProtocolSpec, key: &str, value: &str) -> Result<ProtocolSpec, String> {
    match key.to_ascii_lowercase().as_str() {
        TIMEOUT_KEY => {
            let millis = value
                .parse::<u64>()
                .map_err(|e| format!("invalid timeout '{value}': {e}"))?;
            if millis == 0 {
                return Err("timeout must be greater than zero".to_string());
            }
            Ok(spec.with_timeout(Duration::from_millis(millis)))
        }
        RETRIES_KEY => {
            let retries = value
                .parse::<u32>()
                .map_err(|e| format!("invalid retries '{value}': {e}"))?;
            Ok(spec.with_retries(retries))
        }
        _ => Ok(spec.with_option(key, value)),
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
