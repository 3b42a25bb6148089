//! Schema model: definitions, arena storage and the finished index.
//!
//! The [`Schema`] is the process-scoped global index of the pipeline:
//!
//! ```text
//! Raw records → Readers → [Schema] → Order/Merge → FinishedIndex
//! ```
//!
//! Definitions are created by the readers, mutated in place by the merge
//! passes (name references rewritten to resolved identities, own attributes
//! augmented with inherited ones) and become immutable once copied into a
//! [`FinishedIndex`].

mod atom;
mod concept;
mod finished;
mod ids;
mod link;
mod name;

pub use atom::{Atom, AtomBase, AtomMod};
pub use concept::{Concept, ConceptBase};
pub use finished::{Definition, FinishedIndex};
pub use ids::{AtomId, ConceptId, LinkId};
pub use link::{Link, LinkBase, LinkProperty, Mapping, PropertyAtomRef, SourceRef, TargetRef};
pub use name::{Category, QualName, MODULE_SEP};

use crate::error::SchemaError;
use crate::raw::builtins;
use alloc::collections::BTreeMap;
use alloc::vec::Vec;

/// A category-tagged reference into schema storage.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ItemRef {
    /// An atom definition.
    Atom(AtomId),
    /// A link definition.
    Link(LinkId),
    /// A concept definition.
    Concept(ConceptId),
}

impl ItemRef {
    /// The category of the referenced definition.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Atom(_) => Category::Atom,
            Self::Link(_) => Category::Link,
            Self::Concept(_) => Category::Concept,
        }
    }
}

/// Iteration filter for [`Schema::iter_category`].
///
/// Everything is excluded by default; opt in per flag.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IterFilter {
    /// Include definitions from the builtin module.
    pub include_builtin: bool,
    /// Include synthesized (automatic) definitions.
    pub include_automatic: bool,
    /// Include per-edge implicit link derivatives.
    pub include_implicit: bool,
}

impl IterFilter {
    /// A filter that lets everything through.
    #[must_use]
    pub fn all() -> Self {
        Self {
            include_builtin: true,
            include_automatic: true,
            include_implicit: true,
        }
    }
}

/// The process-scoped schema index.
///
/// Arena storage with stable ids plus a name index. The same qualified name
/// may be re-added across re-reads of the same module (the name index is
/// re-pointed and the previous definition is superseded); re-adding under a
/// different category fails with [`SchemaError::DuplicateDefinition`].
/// Local-scope duplicate detection lives with the reader scope, not here.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    atoms: Vec<Atom>,
    links: Vec<Link>,
    concepts: Vec<Concept>,
    names: BTreeMap<QualName, ItemRef>,
    builtin_seeded: bool,
}

impl Schema {
    /// Create a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn check_category(&self, name: &QualName, category: Category) -> Result<(), SchemaError> {
        match self.names.get(name) {
            Some(existing) if existing.category() != category => {
                Err(SchemaError::DuplicateDefinition {
                    name: name.clone(),
                    category,
                })
            }
            _ => Ok(()),
        }
    }

    // === Atom operations ===

    /// Add an atom and return its id, superseding any previous definition
    /// under the same name.
    ///
    /// # Errors
    ///
    /// Fails when the name is already bound to a different category, or on
    /// arena capacity overflow.
    pub fn add_atom(&mut self, mut atom: Atom) -> Result<AtomId, SchemaError> {
        self.check_category(&atom.name, Category::Atom)?;
        let id = AtomId::from_index(self.atoms.len())
            .ok_or(SchemaError::Capacity(Category::Atom))?;
        atom.id = id;
        self.names.insert(atom.name.clone(), ItemRef::Atom(id));
        self.atoms.push(atom);
        Ok(id)
    }

    /// Get an atom by id.
    #[must_use]
    pub fn get_atom(&self, id: AtomId) -> Option<&Atom> {
        self.atoms.get(id.to_index())
    }

    /// Get a mutable atom by id.
    pub fn get_atom_mut(&mut self, id: AtomId) -> Option<&mut Atom> {
        self.atoms.get_mut(id.to_index())
    }

    /// Look up an atom id by qualified name.
    #[must_use]
    pub fn atom_id(&self, name: &QualName) -> Option<AtomId> {
        match self.names.get(name) {
            Some(ItemRef::Atom(id)) => Some(*id),
            _ => None,
        }
    }

    // === Link operations ===

    /// Add a link and return its id, superseding any previous definition
    /// under the same name.
    ///
    /// # Errors
    ///
    /// Fails when the name is already bound to a different category, or on
    /// arena capacity overflow.
    pub fn add_link(&mut self, mut link: Link) -> Result<LinkId, SchemaError> {
        self.check_category(&link.name, Category::Link)?;
        let id = LinkId::from_index(self.links.len())
            .ok_or(SchemaError::Capacity(Category::Link))?;
        link.id = id;
        self.names.insert(link.name.clone(), ItemRef::Link(id));
        self.links.push(link);
        Ok(id)
    }

    /// Get a link by id.
    #[must_use]
    pub fn get_link(&self, id: LinkId) -> Option<&Link> {
        self.links.get(id.to_index())
    }

    /// Get a mutable link by id.
    pub fn get_link_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.get_mut(id.to_index())
    }

    /// Look up a link id by qualified name.
    #[must_use]
    pub fn link_id(&self, name: &QualName) -> Option<LinkId> {
        match self.names.get(name) {
            Some(ItemRef::Link(id)) => Some(*id),
            _ => None,
        }
    }

    // === Concept operations ===

    /// Add a concept and return its id, superseding any previous definition
    /// under the same name.
    ///
    /// # Errors
    ///
    /// Fails when the name is already bound to a different category, or on
    /// arena capacity overflow.
    pub fn add_concept(&mut self, mut concept: Concept) -> Result<ConceptId, SchemaError> {
        self.check_category(&concept.name, Category::Concept)?;
        let id = ConceptId::from_index(self.concepts.len())
            .ok_or(SchemaError::Capacity(Category::Concept))?;
        concept.id = id;
        self.names.insert(concept.name.clone(), ItemRef::Concept(id));
        self.concepts.push(concept);
        Ok(id)
    }

    /// Get a concept by id.
    #[must_use]
    pub fn get_concept(&self, id: ConceptId) -> Option<&Concept> {
        self.concepts.get(id.to_index())
    }

    /// Get a mutable concept by id.
    pub fn get_concept_mut(&mut self, id: ConceptId) -> Option<&mut Concept> {
        self.concepts.get_mut(id.to_index())
    }

    /// Look up a concept id by qualified name.
    #[must_use]
    pub fn concept_id(&self, name: &QualName) -> Option<ConceptId> {
        match self.names.get(name) {
            Some(ItemRef::Concept(id)) => Some(*id),
            _ => None,
        }
    }

    // === Name index ===

    /// Look up any definition by qualified name.
    #[must_use]
    pub fn get(&self, name: &QualName) -> Option<ItemRef> {
        self.names.get(name).copied()
    }

    /// The category a name is bound to, if any.
    #[must_use]
    pub fn category_of(&self, name: &QualName) -> Option<Category> {
        self.names.get(name).map(ItemRef::category)
    }

    /// Check whether a module has any definition in this schema.
    #[must_use]
    pub fn has_module(&self, module: &str) -> bool {
        self.names.keys().any(|name| name.module() == module)
    }

    /// Iterate qualified names of one category, in name order.
    pub fn iter_category(
        &self,
        category: Category,
        filter: IterFilter,
    ) -> impl Iterator<Item = &QualName> {
        self.names
            .iter()
            .filter(move |(name, item)| item.category() == category && self.passes(name, item, filter))
            .map(|(name, _)| name)
    }

    fn passes(&self, name: &QualName, item: &ItemRef, filter: IterFilter) -> bool {
        if !filter.include_builtin && builtins::is_builtin(name) {
            return false;
        }
        match item {
            ItemRef::Atom(id) => {
                filter.include_automatic
                    || !self.get_atom(*id).is_some_and(|a| a.automatic)
            }
            ItemRef::Link(id) => {
                let Some(link) = self.get_link(*id) else {
                    return false;
                };
                if !filter.include_automatic && link.automatic {
                    return false;
                }
                filter.include_implicit || !link.implicit_derivative
            }
            ItemRef::Concept(_) => true,
        }
    }

    // === Counts and load state ===

    /// Number of atom definitions ever added (superseded ones included).
    #[must_use]
    pub fn atom_count(&self) -> usize {
        self.atoms.len()
    }

    /// Number of link definitions ever added (superseded ones included).
    #[must_use]
    pub fn link_count(&self) -> usize {
        self.links.len()
    }

    /// Number of concept definitions ever added (superseded ones included).
    #[must_use]
    pub fn concept_count(&self) -> usize {
        self.concepts.len()
    }

    /// Whether the builtin module has been read into this schema.
    #[must_use]
    pub fn is_seeded(&self) -> bool {
        self.builtin_seeded
    }

    pub(crate) fn mark_seeded(&mut self) {
        self.builtin_seeded = true;
    }
}
