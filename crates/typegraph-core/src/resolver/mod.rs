//! Schema resolution.
//!
//! The resolver turns raw module records into a fully linearized,
//! inheritance-merged type graph. It handles:
//!
//! - Name normalization against the module scope (imports, aliases, builtins,
//!   host types)
//! - Implicit type synthesis (inline automatic atoms, per-edge link
//!   derivatives)
//! - Per-category dependency/merge graph ordering
//! - Consistency checks (cardinality, category conflicts, cycle freedom)
//!
//! # Pipeline
//!
//! ```text
//! ModuleRecords → read atoms/links/concepts → order atoms/links/concepts → FinishedIndex
//! ```
//!
//! # Builtins
//!
//! A fresh [`Schema`] is pre-seeded with the builtin module (`std`) through
//! the same read pipeline, so the canonical roots (`std.Object`, `std.link`)
//! and the base atoms resolve without any user-provided records.
//!
//! # Usage
//!
//! ```ignore
//! use typegraph_core::model::Schema;
//! use typegraph_core::host::NoHostTypes;
//! use typegraph_core::resolver::{resolve, ResolveOptions};
//!
//! let mut schema = Schema::new();
//! let index = resolve(&mut schema, records, &NoHostTypes, &ResolveOptions::default())?
//!     .expect("toplevel load produces an index");
//! for (name, definition) in index.iter() {
//!     // definitions arrive in dependency order
//! }
//! ```

pub mod context;
pub mod phases;
pub mod scope;
pub mod tracing;

pub use context::ResolverContext;
pub use scope::ModuleScope;
pub use tracing::{NoopTracer, Phase, TraceEvent, TraceLevel, Tracer};

use crate::error::SchemaError;
use crate::host::{HostTypeResolver, NoHostTypes};
use crate::model::{Definition, FinishedIndex, QualName, Schema};
use crate::raw::{builtins, ModuleRecords};
use crate::trace_event;
use alloc::vec::Vec;

/// Options controlling one `resolve` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Whether this load is the outermost one. Nested (imported) module loads
    /// pass `false` and defer ordering and consolidation to the enclosing
    /// load.
    pub toplevel: bool,
    /// Whether builtin-module definitions are written into the finished
    /// index.
    pub include_builtin: bool,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            toplevel: true,
            include_builtin: false,
        }
    }
}

/// Resolve one module's records into the schema.
///
/// Reads the records (seeding the builtin module first on a fresh schema),
/// and on a toplevel load orders and merges all three categories before
/// consolidating the result. Returns `Ok(None)` for nested loads.
///
/// # Partial failure
///
/// A failing pass aborts the load, but categories fully ordered before the
/// failure remain merged inside the process-scoped [`Schema`]; only the
/// [`FinishedIndex`] is withheld. Callers that need all-or-nothing semantics
/// should resolve into a scratch [`Schema`] and swap it in on success.
///
/// # Errors
///
/// Any [`SchemaError`]; see the error type for the failure modes.
pub fn resolve(
    schema: &mut Schema,
    records: ModuleRecords,
    host: &dyn HostTypeResolver,
    options: &ResolveOptions,
) -> Result<Option<FinishedIndex>, SchemaError> {
    let mut tracer = NoopTracer;
    resolve_with(schema, records, host, options, &mut tracer)
}

/// Like [`resolve`], with structured trace events delivered to `tracer`.
#[cfg(feature = "tracing")]
pub fn resolve_traced(
    schema: &mut Schema,
    records: ModuleRecords,
    host: &dyn HostTypeResolver,
    options: &ResolveOptions,
    tracer: &mut dyn Tracer,
) -> Result<Option<FinishedIndex>, SchemaError> {
    resolve_with(schema, records, host, options, tracer)
}

fn resolve_with(
    schema: &mut Schema,
    records: ModuleRecords,
    host: &dyn HostTypeResolver,
    options: &ResolveOptions,
    tracer: &mut dyn Tracer,
) -> Result<Option<FinishedIndex>, SchemaError> {
    if !schema.is_seeded() {
        seed_builtins(schema, tracer)?;
    }

    read_module(schema, &records, host, tracer)?;

    if !options.toplevel {
        return Ok(None);
    }

    let atoms = phases::order_atoms(schema, tracer)?;
    let links = phases::order_links(schema, tracer)?;
    let concepts = phases::order_concepts(schema, tracer)?;

    Ok(Some(consolidate(
        schema, &atoms, &links, &concepts, options, tracer,
    )))
}

/// Run the three read phases for one module's records.
fn read_module(
    schema: &mut Schema,
    records: &ModuleRecords,
    host: &dyn HostTypeResolver,
    tracer: &mut dyn Tracer,
) -> Result<(), SchemaError> {
    let scope = ModuleScope::new(&records.module, records.aliases.clone());
    let mut ctx = ResolverContext::new(schema, scope, host, records.backend.clone(), tracer);
    phases::read_atoms(&mut ctx, &records.atoms)?;
    phases::read_links(&mut ctx, &records.links)?;
    phases::read_concepts(&mut ctx, &records.concepts)?;
    Ok(())
}

/// Read the builtin module into a fresh schema.
fn seed_builtins(schema: &mut Schema, tracer: &mut dyn Tracer) -> Result<(), SchemaError> {
    read_module(schema, &builtins::builtin_records(), &NoHostTypes, tracer)?;
    schema.mark_seeded();
    Ok(())
}

/// Write the merged, ordered definitions into a finished index: all atoms,
/// then all links, then all concepts, each in dependency order, skipping the
/// builtin module unless requested.
fn consolidate(
    schema: &Schema,
    atoms: &[QualName],
    links: &[QualName],
    concepts: &[QualName],
    options: &ResolveOptions,
    tracer: &mut dyn Tracer,
) -> FinishedIndex {
    trace_event!(
        tracer,
        TraceLevel::Info,
        TraceEvent::PhaseStart {
            phase: Phase::Consolidate,
        }
    );

    let mut index = FinishedIndex::new();
    let mut skipped = 0usize;

    let mut keep = |name: &QualName| -> bool {
        if !options.include_builtin && builtins::is_builtin(name) {
            skipped += 1;
            false
        } else {
            true
        }
    };

    let mut atom_defs: Vec<Definition> = Vec::new();
    for name in atoms {
        if keep(name) {
            if let Some(atom) = schema.atom_id(name).and_then(|id| schema.get_atom(id)) {
                atom_defs.push(Definition::Atom(atom.clone()));
            }
        }
    }
    let mut link_defs: Vec<Definition> = Vec::new();
    for name in links {
        if keep(name) {
            if let Some(link) = schema.link_id(name).and_then(|id| schema.get_link(id)) {
                link_defs.push(Definition::Link(link.clone()));
            }
        }
    }
    let mut concept_defs: Vec<Definition> = Vec::new();
    for name in concepts {
        if keep(name) {
            if let Some(concept) = schema.concept_id(name).and_then(|id| schema.get_concept(id)) {
                concept_defs.push(Definition::Concept(concept.clone()));
            }
        }
    }

    for definition in atom_defs.into_iter().chain(link_defs).chain(concept_defs) {
        index.push(definition);
    }

    trace_event!(
        tracer,
        TraceLevel::Info,
        TraceEvent::Consolidated {
            count: index.len(),
            skipped_builtin: skipped,
        }
    );
    index
}
