//! Concept (entity type) definitions.

use super::ids::{ConceptId, LinkId};
use super::name::QualName;
use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

/// A reference to a base concept, rewritten to an identity during ordering.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConceptBase {
    /// Normalized but not yet resolved base concept name.
    Named(QualName),
    /// Resolved base concept identity.
    Resolved(ConceptId),
}

/// An entity type definition.
///
/// A concept may declare several differently-targeted links under one short
/// name; the per-name `Vec` is that polymorphic link set.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Concept {
    /// Concept identifier, assigned by
    /// [`Schema::add_concept`](super::Schema::add_concept).
    pub id: ConceptId,
    /// Qualified name.
    pub name: QualName,
    /// Ordered schema bases (multiple inheritance; first listed wins).
    pub base: Vec<ConceptBase>,
    /// Opaque non-schema base types. Never merged structurally.
    pub host_bases: Vec<QualName>,
    /// Abstract concepts cannot be instantiated.
    pub is_abstract: bool,
    /// Module-level backend tag inherited at read time.
    pub backend: Option<String>,
    /// Human-readable title.
    pub title: Option<String>,
    /// Description text.
    pub description: Option<String>,
    /// Own links keyed by short link name.
    pub links: BTreeMap<String, Vec<LinkId>>,
    /// Links of other concepts targeting this concept, keyed by short name.
    pub rlinks: BTreeMap<String, Vec<LinkId>>,
}

impl Concept {
    /// Create a new concept definition.
    ///
    /// The `id` field is initialized to a placeholder and assigned when the
    /// concept is added to the schema.
    #[must_use]
    pub fn new(name: QualName) -> Self {
        Self {
            id: ConceptId::placeholder(),
            name,
            base: Vec::new(),
            host_bases: Vec::new(),
            is_abstract: false,
            backend: None,
            title: None,
            description: None,
            links: BTreeMap::new(),
            rlinks: BTreeMap::new(),
        }
    }

    /// Attach a link variant under a short name, keeping insertion order.
    pub fn add_link(&mut self, short_name: &str, link: LinkId) {
        let set = self.links.entry(String::from(short_name)).or_default();
        if !set.contains(&link) {
            set.push(link);
        }
    }

    /// Register a link of another concept that targets this concept.
    pub fn add_rlink(&mut self, short_name: &str, link: LinkId) {
        let set = self.rlinks.entry(String::from(short_name)).or_default();
        if !set.contains(&link) {
            set.push(link);
        }
    }

    /// Resolved direct base identities (empty until ordering).
    pub fn base_ids(&self) -> impl Iterator<Item = ConceptId> + '_ {
        self.base.iter().filter_map(|b| match b {
            ConceptBase::Resolved(id) => Some(*id),
            ConceptBase::Named(_) => None,
        })
    }
}
