//! Maps protocol identifiers to the probers that implement them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use multiping_common::{Prober, ProtocolId, RegistryError};
use multiping_protocols::{HttpProber, IcmpProber, TcpProber};
use tracing::warn;

/// Probers keyed by protocol, remembering registration order.
#[derive(Clone, Default)]
pub struct Registry {
    order: Vec<ProtocolId>,
    probers: HashMap<ProtocolId, Arc<dyn Prober>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in prober: `icmp`, `http` and `tcp`.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(IcmpProber::new());
        registry.register(HttpProber::new());
        registry.register(TcpProber::new());
        registry
    }

    pub fn register<P: Prober + 'static>(&mut self, prober: P) {
        self.register_arc(Arc::new(prober));
    }

    /// Registers a shared prober. A later registration for the same protocol
    /// replaces the earlier one but keeps its position.
    pub fn register_arc(&mut self, prober: Arc<dyn Prober>) {
        let id = prober.protocol();
        if self.probers.insert(id.clone(), prober).is_some() {
            warn!("prober for '{id}' replaced");
        } else {
            self.order.push(id);
        }
    }

    pub fn resolve(&self, id: &ProtocolId) -> Result<Arc<dyn Prober>, RegistryError> {
        self.probers
            .get(id)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownProtocol(id.clone()))
    }

    pub fn contains(&self, id: &ProtocolId) -> bool {
        self.probers.contains_key(id)
    }

    /// Registered protocols in registration order.
    pub fn list_enabled(&self) -> &[ProtocolId] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("protocols", &self.order)
            .finish()
    }
}
