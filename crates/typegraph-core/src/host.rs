//! Host-type resolution.
//!
//! Concepts may declare non-schema base types implemented by the embedding
//! host. The resolver only needs to know whether such a name exists and which
//! capabilities it satisfies; everything else about host types is opaque and
//! never merged structurally. Collaborators implement [`HostTypeResolver`] at
//! this seam.

use crate::model::QualName;
use alloc::vec::Vec;

/// A capability a host type may satisfy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum HostCapability {
    /// Usable as a concept (entity) base.
    Entity,
    /// Usable as an atom (scalar) base.
    Scalar,
}

/// A resolved host type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HostType {
    /// The qualified name the host type answers to.
    pub name: QualName,
    /// The capabilities it satisfies.
    pub capabilities: Vec<HostCapability>,
}

impl HostType {
    /// Create a host type with the given capabilities.
    #[must_use]
    pub fn new(name: QualName, capabilities: Vec<HostCapability>) -> Self {
        Self { name, capabilities }
    }

    /// Check whether the host type satisfies a capability.
    #[must_use]
    pub fn has(&self, capability: HostCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// Resolves names against the host's non-schema type namespace.
pub trait HostTypeResolver {
    /// Whether the host claims a module namespace.
    fn owns_module(&self, module: &str) -> bool;

    /// All host types answering to an unqualified name, across every host
    /// namespace. Used for ambiguity detection during normalization.
    fn lookup_short(&self, name: &str) -> Vec<QualName>;

    /// Resolve a qualified name to a host type, if the host provides one.
    fn resolve(&self, name: &QualName) -> Option<HostType>;
}

/// A host resolver that provides no types at all.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoHostTypes;

impl HostTypeResolver for NoHostTypes {
    fn owns_module(&self, _module: &str) -> bool {
        false
    }

    fn lookup_short(&self, _name: &str) -> Vec<QualName> {
        Vec::new()
    }

    fn resolve(&self, _name: &QualName) -> Option<HostType> {
        None
    }
}
