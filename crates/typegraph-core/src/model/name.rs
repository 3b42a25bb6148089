//! Qualified names and definition categories.

use alloc::string::{String, ToString};

/// The separator between the module part and the local part of a name.
///
/// Module names may themselves contain separators (`acme.billing`); the local
/// part never does, so qualified names split at the last occurrence.
pub const MODULE_SEP: char = '.';

/// A module-qualified definition name, e.g. `app.Person`.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct QualName {
    module: String,
    name: String,
}

impl core::fmt::Debug for QualName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "QualName({self})")
    }
}

impl QualName {
    /// Create a qualified name from its module and local parts.
    #[must_use]
    pub fn new(module: &str, name: &str) -> Self {
        Self {
            module: module.to_string(),
            name: name.to_string(),
        }
    }

    /// Split a dotted reference into a qualified name.
    ///
    /// Returns `None` when the input contains no separator.
    #[must_use]
    pub fn parse(reference: &str) -> Option<Self> {
        let (module, name) = reference.rsplit_once(MODULE_SEP)?;
        if module.is_empty() || name.is_empty() {
            return None;
        }
        Some(Self::new(module, name))
    }

    /// Check whether a reference carries a module part.
    #[must_use]
    pub fn is_qualified(reference: &str) -> bool {
        reference.contains(MODULE_SEP)
    }

    /// The module part.
    #[must_use]
    pub fn module(&self) -> &str {
        &self.module
    }

    /// The local (unqualified) part.
    #[must_use]
    pub fn local(&self) -> &str {
        &self.name
    }
}

impl core::fmt::Display for QualName {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}{}{}", self.module, MODULE_SEP, self.name)
    }
}

/// The three definition categories of a schema.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Category {
    /// Scalar/value type.
    Atom,
    /// Typed directed relation type.
    Link,
    /// Entity/object type.
    Concept,
}

impl Category {
    /// Get a string representation.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Atom => "atom",
            Self::Link => "link",
            Self::Concept => "concept",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}
