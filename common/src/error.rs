use thiserror::Error;

use crate::network::protocol::ProtocolId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no prober registered for protocol '{0}'")]
    UnknownProtocol(ProtocolId),
}

/// Problems detected before any probe is sent. A run that fails with one of
/// these produces no report.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("unknown protocol '{0}'")]
    UnknownProtocol(ProtocolId),
    #[error("protocol '{0}' is enabled more than once")]
    DuplicateProtocol(ProtocolId),
    #[error("host '{0}' appears more than once in the inventory")]
    DuplicateHost(String),
    #[error("the inventory is empty")]
    EmptyInventory,
    #[error("no protocols are enabled")]
    NoProtocols,
    #[error("invalid option for protocol '{protocol}': {reason}")]
    InvalidOption { protocol: ProtocolId, reason: String },
    #[error("invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<RegistryError> for ConfigurationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownProtocol(id) => ConfigurationError::UnknownProtocol(id),
        }
    }
}
