//! Atom (scalar type) definitions.

use super::ids::AtomId;
use super::name::QualName;
use crate::raw::RawValue;
use alloc::string::String;
use alloc::vec::Vec;

/// A constraint modifier attached to an atom.
///
/// Modifiers are kept in declaration order; merge never reorders them.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AtomMod {
    /// Free-form constraint expression.
    Expr(String),
    /// Minimum value/string length.
    MinLength(u64),
    /// Maximum value/string length.
    MaxLength(u64),
    /// Regular expression pattern the value must match.
    Pattern(String),
}

impl AtomMod {
    /// Get the record key this modifier is declared under.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Expr(_) => "expr",
            Self::MinLength(_) => "min-length",
            Self::MaxLength(_) => "max-length",
            Self::Pattern(_) => "regexp",
        }
    }
}

/// The base reference of an atom.
///
/// Starts out as a normalized qualified name and is rewritten to a resolved
/// identity during atom ordering. Host bases name non-schema types and are
/// never resolved into the schema.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AtomBase {
    /// Normalized but not yet resolved base atom name.
    Named(QualName),
    /// Resolved base atom identity.
    Resolved(AtomId),
    /// Opaque non-schema (host) base type.
    Host(QualName),
}

/// A scalar type definition.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Atom {
    /// Atom identifier, assigned by [`Schema::add_atom`](super::Schema::add_atom).
    pub id: AtomId,
    /// Qualified name.
    pub name: QualName,
    /// Single-inheritance base, if any.
    pub base: Option<AtomBase>,
    /// Default value for fields of this type.
    pub default: Option<RawValue>,
    /// Human-readable title.
    pub title: Option<String>,
    /// Description text.
    pub description: Option<String>,
    /// Abstract atoms cannot be used as field types directly.
    pub is_abstract: bool,
    /// True when this atom was synthesized rather than declared.
    ///
    /// An automatic atom's local name encodes its one originating
    /// `(host, field)` pair: `__{host}__{field}`.
    pub automatic: bool,
    /// Module-level backend tag inherited at read time.
    pub backend: Option<String>,
    /// Constraint modifiers, in declaration order.
    pub mods: Vec<AtomMod>,
}

impl Atom {
    /// Create a new atom definition.
    ///
    /// The `id` field is initialized to a placeholder and assigned when the
    /// atom is added to the schema.
    #[must_use]
    pub fn new(name: QualName) -> Self {
        Self {
            id: AtomId::placeholder(),
            name,
            base: None,
            default: None,
            title: None,
            description: None,
            is_abstract: false,
            automatic: false,
            backend: None,
            mods: Vec::new(),
        }
    }

    /// The resolved base identity, if ordering has rewritten it.
    #[must_use]
    pub fn base_id(&self) -> Option<AtomId> {
        match self.base {
            Some(AtomBase::Resolved(id)) => Some(id),
            _ => None,
        }
    }
}
