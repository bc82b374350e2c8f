//! # Host Inventory
//!
//! Builds the ordered host list a run probes from command-line arguments and
//! inventory files.
//!
//! Inventory files hold one host per line:
//!
//! ```text
//! # address      label          metadata
//! 10.0.0.1       core-switch    rack=r12 dc=fra
//! example.org
//! 2001:db8::10   v6-gateway
//! ```
//!
//! Blank lines and `#` comments are skipped. Addresses that look like IP
//! literals must parse as one, so typos such as `10.0.0.256` are reported
//! instead of being handed to the resolver.

use std::collections::HashSet;
use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::network::host::Host;

pub const DEFAULT_INVENTORY_FILE: &str = "ip_list.txt";

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("failed to read inventory {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{origin}: invalid address '{address}'")]
    InvalidAddress { origin: String, address: String },
    #[error("{origin}: '{address}' is listed more than once")]
    DuplicateAddress { origin: String, address: String },
    #[error("{origin}: invalid metadata '{token}', expected key=value")]
    InvalidMetadata { origin: String, token: String },
}

/// Ordered, duplicate-free collection of hosts.
#[derive(Debug, Default, Clone)]
pub struct Inventory {
    hosts: Vec<Host>,
    seen: HashSet<String>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }

    pub fn hosts(&self) -> &[Host] {
        &self.hosts
    }

    pub fn into_hosts(self) -> Vec<Host> {
        self.hosts
    }

    /// Adds a host, validating its address and rejecting duplicates.
    pub fn add(&mut self, host: Host, origin: &str) -> Result<(), InventoryError> {
        let address = host.address();
        if !is_valid_address(address) {
            return Err(InventoryError::InvalidAddress {
                origin: origin.to_string(),
                address: address.to_string(),
            });
        }
        if !self.seen.insert(address.to_ascii_lowercase()) {
            return Err(InventoryError::DuplicateAddress {
                origin: origin.to_string(),
                address: address.to_string(),
            });
        }
        self.hosts.push(host);
        Ok(())
    }

    /// Adds hosts given as arguments; each argument may be a comma separated
    /// list (e.g. `"10.0.0.1, example.org"`).
    pub fn extend_from_args<I, S>(&mut self, args: I) -> Result<(), InventoryError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for arg in args {
            for part in arg.as_ref().split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                self.add(Host::new(part), "argument")?;
            }
        }
        Ok(())
    }

    /// Adds every host found in inventory text. `name` prefixes error origins.
    pub fn extend_from_text(&mut self, text: &str, name: &str) -> Result<(), InventoryError> {
        for (idx, line) in text.lines().enumerate() {
            let origin = format!("{name}:{}", idx + 1);
            if let Some(host) = parse_line(line, &origin)? {
                self.add(host, &origin)?;
            }
        }
        Ok(())
    }

    pub fn load(&mut self, path: &Path) -> Result<(), InventoryError> {
        let text = fs::read_to_string(path).map_err(|source| InventoryError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.extend_from_text(&text, &path.display().to_string())
    }
}

/// Parses one inventory line. Returns `None` for blank and comment lines.
fn parse_line(line: &str, origin: &str) -> Result<Option<Host>, InventoryError> {
    let content = match line.split_once('#') {
        Some((before, _comment)) => before,
        None => line,
    };

    let mut tokens = content.split_whitespace();
    let Some(address) = tokens.next() else {
        return Ok(None);
    };

    let mut host = Host::new(address);
    let mut label_words: Vec<&str> = Vec::new();

    for token in tokens {
        match token.split_once('=') {
            Some((key, value)) if !key.is_empty() => {
                host = host.with_metadata(key, value);
            }
            Some(_) => {
                return Err(InventoryError::InvalidMetadata {
                    origin: origin.to_string(),
                    token: token.to_string(),
                });
            }
            None => label_words.push(token),
        }
    }

    if !label_words.is_empty() {
        host = host.with_label(label_words.join(" "));
    }

    Ok(Some(host))
}

/// Names must be hostname-shaped; anything that looks like an IP literal must
/// actually be one.
fn is_valid_address(address: &str) -> bool {
    if address.is_empty() {
        return false;
    }
    if looks_like_ip(address) {
        return address.parse::<IpAddr>().is_ok();
    }
    address
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '.' || c == '_')
        && !address.starts_with('-')
        && !address.starts_with('.')
}

fn looks_like_ip(address: &str) -> bool {
    let dotted_digits = address.chars().all(|c| c.is_ascii_digit() || c == '.');
    let colon_hex = address.contains(':')
        && address
            .chars()
            .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.');
    dotted_digits || colon_hex
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
