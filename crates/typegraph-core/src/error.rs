//! Errors raised during schema resolution.
//!
//! Every error is fatal to the current load: schema loading is not transient
//! and nothing is retried. Variants carry the qualified names and categories a
//! collaborator needs to produce a human-readable diagnostic; the core itself
//! never logs.

use crate::model::{Category, Mapping, QualName};
use alloc::string::String;
use alloc::vec::Vec;

/// A failure encountered while resolving a schema load.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum SchemaError {
    /// A short or qualified name did not resolve to any definition.
    #[error("unresolved reference to `{name}` in module `{module}`")]
    UnresolvedName {
        /// The name as written in the declaration.
        name: String,
        /// The module whose scope was searched.
        module: String,
    },

    /// A qualified name referenced a module never registered for this scope.
    #[error("unknown module `{module}` in reference `{name}`")]
    UnknownModule {
        /// The unresolvable module part.
        module: String,
        /// The full reference as written.
        name: String,
    },

    /// A short name matched definitions in more than one visible namespace.
    #[error("ambiguous reference `{name}`: matches {candidates:?}")]
    AmbiguousReference {
        /// The name as written.
        name: String,
        /// Every qualified name the reference could mean.
        candidates: Vec<QualName>,
    },

    /// The same qualified name was registered twice incompatibly.
    #[error("duplicate definition of {category} `{name}`")]
    DuplicateDefinition {
        /// The colliding qualified name.
        name: QualName,
        /// The category of the later registration.
        category: Category,
    },

    /// A non-schema base class does not satisfy the entity capability.
    #[error("invalid host base `{base}` for concept `{concept}`: entity capability required")]
    InvalidHostBase {
        /// The concept declaring the base.
        concept: QualName,
        /// The offending host type.
        base: QualName,
    },

    /// The merge/dependency graph of a category contains a cycle.
    #[error("structural cycle among {category} definitions: {members:?}")]
    StructuralCycle {
        /// The category whose ordering failed.
        category: Category,
        /// Qualified names of every definition on the cycle.
        members: Vec<QualName>,
    },

    /// A link targeting an atom carried a mapping other than one-to-one.
    #[error("link `{link}` targets an atom and must map one-to-one, not `{mapping}`")]
    InvalidCardinality {
        /// The offending link.
        link: QualName,
        /// The mapping that was declared or inherited.
        mapping: Mapping,
    },

    /// One link name was bound to both atom and concept targets.
    #[error("link `{link_name}` on `{owner}` is bound to both atom and concept targets")]
    CategoryConflict {
        /// The definition owning the conflicting closure.
        owner: QualName,
        /// The short link name bound to both categories.
        link_name: String,
    },

    /// A raw record did not have the shape the reader expects.
    #[error("invalid declaration `{name}`: {detail}")]
    InvalidDeclaration {
        /// The short name of the record being decoded.
        name: String,
        /// What was wrong with it.
        detail: String,
    },

    /// Arena id space exhausted (more than `u32::MAX - 1` definitions).
    #[error("schema capacity exceeded: too many {0} definitions")]
    Capacity(Category),
}
