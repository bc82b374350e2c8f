use std::collections::BTreeMap;
use std::fmt;
use std::net::IpAddr;

/// One inventory entry: the address to probe plus presentation data.
///
/// The address is either a DNS name or a literal IP address. Name resolution
/// is left to the probers so every attempt sees the current record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Host {
    address: String,
    label: Option<String>,
    metadata: BTreeMap<String, String>,
}

impl Host {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            label: None,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub fn metadata(&self) -> &BTreeMap<String, String> {
        &self.metadata
    }

    /// The literal IP address, if the host was given as one.
    pub fn ip(&self) -> Option<IpAddr> {
        self.address.parse::<IpAddr>().ok()
    }

    /// Label when present, address otherwise.
    pub fn display_name(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.address)
    }
}

impl fmt::Display for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.label {
            Some(label) => write!(f, "{} ({})", self.address, label),
            None => f.write_str(&self.address),
        }
    }
}
