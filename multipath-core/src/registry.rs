//! Ordered registry of tabular backends

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::interface::{DimRequest, Interface, Resolution, Resolve};
use crate::table::{Datatype, RawData};

/// Backends in priority order.
///
/// Built once at startup and shared behind an `Arc`; there is no way to add
/// or remove a backend afterwards.
pub struct Registry {
    interfaces: Vec<Arc<dyn Interface>>,
}

impl Registry {
    /// Start building a registry
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Datatype tags in priority order
    pub fn datatypes(&self) -> Vec<Datatype> {
        self.interfaces.iter().map(|i| i.datatype()).collect()
    }

    /// Number of registered backends
    pub fn len(&self) -> usize {
        self.interfaces.len()
    }

    /// Check if no backend is registered
    pub fn is_empty(&self) -> bool {
        self.interfaces.is_empty()
    }

    /// Backend owning tables with the given tag
    pub fn interface(&self, datatype: Datatype) -> Result<&dyn Interface> {
        self.interfaces
            .iter()
            .find(|i| i.datatype() == datatype)
            .map(AsRef::as_ref)
            .ok_or_else(|| Error::UnknownDatatype(datatype.to_string()))
    }

    /// Offer raw data to each backend in priority order until one accepts it.
    ///
    /// `index` is the position of the input and is only used for reporting.
    pub fn resolve(&self, index: usize, raw: &RawData, request: &DimRequest) -> Result<Resolution> {
        let mut reasons = Vec::with_capacity(self.interfaces.len());
        for interface in &self.interfaces {
            match interface.resolve(raw, request) {
                Resolve::Accepted(resolution) => {
                    debug!(index, datatype = %interface.datatype(), "resolved path backend");
                    return Ok(resolution);
                }
                Resolve::Rejected(reason) => {
                    trace!(index, datatype = %interface.datatype(), %reason, "backend rejected path");
                    reasons.push(format!("{}: {}", interface.datatype(), reason));
                }
            }
        }
        Err(Error::UnresolvableBackend { index, reasons })
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("datatypes", &self.datatypes())
            .finish()
    }
}

/// A builder for creating registries
pub struct RegistryBuilder {
    interfaces: Vec<Arc<dyn Interface>>,
}

impl RegistryBuilder {
    /// Create a new, empty registry builder
    pub fn new() -> Self {
        Self {
            interfaces: Vec::new(),
        }
    }

    /// Append a backend; earlier registrations take priority
    #[must_use]
    pub fn register<I: Interface + 'static>(mut self, interface: I) -> Self {
        self.interfaces.push(Arc::new(interface));
        self
    }

    /// Build the registry
    pub fn build(self) -> Result<Registry> {
        for (i, interface) in self.interfaces.iter().enumerate() {
            let datatype = interface.datatype();
            if self.interfaces[..i].iter().any(|other| other.datatype() == datatype) {
                return Err(Error::InvalidArgument(format!(
                    "backend for datatype {datatype} registered twice"
                )));
            }
        }
        Ok(Registry {
            interfaces: self.interfaces,
        })
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}
