//! Link (relation type) definitions.

use super::ids::{AtomId, ConceptId, LinkId};
use super::name::QualName;
use crate::raw::RawValue;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// Mapping cardinality of a link.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Mapping {
    /// One source, one target.
    OneToOne,
    /// One source, many targets.
    OneToMany,
    /// Many sources, one target.
    ManyToOne,
    /// Many sources, many targets.
    ManyToMany,
}

impl Mapping {
    /// Get the two-character wire code (`11`, `1*`, `*1`, `**`).
    #[must_use]
    pub fn as_code(&self) -> &'static str {
        match self {
            Self::OneToOne => "11",
            Self::OneToMany => "1*",
            Self::ManyToOne => "*1",
            Self::ManyToMany => "**",
        }
    }

    /// Parse a wire code.
    #[must_use]
    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "11" => Some(Self::OneToOne),
            "1*" => Some(Self::OneToMany),
            "*1" => Some(Self::ManyToOne),
            "**" => Some(Self::ManyToMany),
            _ => None,
        }
    }
}

impl core::fmt::Display for Mapping {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_code())
    }
}

/// A reference to a base link, rewritten to an identity during ordering.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LinkBase {
    /// Normalized but not yet resolved base link name.
    Named(QualName),
    /// Resolved base link identity.
    Resolved(LinkId),
}

/// A reference to the concept a link originates from.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceRef {
    /// Normalized but not yet resolved source concept name.
    Named(QualName),
    /// Resolved source concept identity.
    Resolved(ConceptId),
}

/// A reference to the type a link points at.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TargetRef {
    /// Normalized but not yet resolved target name.
    Named(QualName),
    /// Resolved atom target.
    Atom(AtomId),
    /// Resolved concept target.
    Concept(ConceptId),
}

/// A reference to the atom type of a link property.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PropertyAtomRef {
    /// Normalized but not yet resolved atom name.
    Named(QualName),
    /// Resolved atom identity.
    Resolved(AtomId),
}

/// A scalar attribute of a link.
///
/// Property names are qualified as `module.link__property`; the short name is
/// the part after the last `__`.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkProperty {
    /// Qualified property name.
    pub name: QualName,
    /// The atom type of the property value.
    pub atom: PropertyAtomRef,
    /// Default value.
    pub default: Option<RawValue>,
    /// Human-readable title.
    pub title: Option<String>,
    /// Description text.
    pub description: Option<String>,
}

impl LinkProperty {
    /// The short property name (the part after the owning link's name).
    #[must_use]
    pub fn short_name(&self) -> &str {
        match self.name.local().rsplit_once("__") {
            Some((_, short)) => short,
            None => self.name.local(),
        }
    }
}

/// A typed, directed relation type.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Link {
    /// Link identifier, assigned by [`Schema::add_link`](super::Schema::add_link).
    pub id: LinkId,
    /// Qualified name.
    pub name: QualName,
    /// Source concept; `None` for vocabulary (unattached) links.
    pub source: Option<SourceRef>,
    /// Target type; `None` for vocabulary links.
    pub target: Option<TargetRef>,
    /// Ordered base links (multiple inheritance; first listed wins).
    pub base: Vec<LinkBase>,
    /// Mapping cardinality; inherited from the base chain when unset.
    pub mapping: Option<Mapping>,
    /// Required flag; inherited from the base chain when unset.
    pub required: Option<bool>,
    /// Properties keyed by qualified name.
    pub properties: BTreeMap<QualName, LinkProperty>,
    /// True for the per-edge subtype derived for each
    /// `(source, target, base-name)` combination.
    pub implicit_derivative: bool,
    /// True when this link was synthesized rather than declared.
    pub automatic: bool,
    /// True for a vocabulary link first bound to atom targets.
    pub is_atomic: bool,
    /// Abstract links only exist to be inherited from.
    pub is_abstract: bool,
    /// Human-readable title.
    pub title: Option<String>,
    /// Description text.
    pub description: Option<String>,
}

impl Link {
    /// Create a new link definition.
    ///
    /// The `id` field is initialized to a placeholder and assigned when the
    /// link is added to the schema.
    #[must_use]
    pub fn new(name: QualName) -> Self {
        Self {
            id: LinkId::placeholder(),
            name,
            source: None,
            target: None,
            base: Vec::new(),
            mapping: None,
            required: None,
            properties: BTreeMap::new(),
            implicit_derivative: false,
            automatic: false,
            is_atomic: false,
            is_abstract: false,
            title: None,
            description: None,
        }
    }

    /// Effective mapping, defaulting to many-to-many for unmerged links.
    #[must_use]
    pub fn mapping(&self) -> Mapping {
        self.mapping.unwrap_or(Mapping::ManyToMany)
    }

    /// Effective required flag, defaulting to optional.
    #[must_use]
    pub fn required(&self) -> bool {
        self.required.unwrap_or(false)
    }

    /// Whether the resolved target is an atom.
    #[must_use]
    pub fn targets_atom(&self) -> bool {
        matches!(self.target, Some(TargetRef::Atom(_)))
    }
}
