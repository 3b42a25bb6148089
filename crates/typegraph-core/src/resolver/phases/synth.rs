//! Implicit type synthesis.
//!
//! Two synthesis rules run during the read passes:
//!
//! 1. A link or concept field carrying inline modifiers instead of
//!    referencing a pre-declared atom gets a fresh automatic atom, named
//!    after its one originating `(host, field)` pair.
//! 2. Every own-link a concept attaches becomes a per-edge link subtype keyed
//!    by `(source, target, base link)`, so each edge is structurally distinct
//!    and independently mergeable even though concepts share the link
//!    vocabulary.
//!
//! Synthesized definitions are registered into the global and local indexes
//! immediately, so the later ordering passes observe them like any declared
//! definition.

use crate::error::SchemaError;
use crate::model::{Atom, AtomBase, AtomMod, Category, QualName};
use crate::raw::RawValue;
use crate::resolver::context::ResolverContext;
use crate::resolver::tracing::{TraceEvent, TraceLevel};
use crate::trace_event;
use alloc::string::String;
use alloc::vec::Vec;

/// The deterministic local name of an inline-synthesized atom.
#[must_use]
pub fn inline_atom_name(host_local: &str, field: &str) -> String {
    alloc::format!("__{host_local}__{field}")
}

fn mangle(name: &QualName) -> String {
    let mut out = String::with_capacity(name.module().len() + name.local().len() + 1);
    for part in name.module().split('.') {
        out.push_str(part);
        out.push('_');
    }
    out.push_str(name.local());
    out
}

/// The deterministic local name of a per-edge link derivative.
///
/// Unique per `(source, target, base link local name)` triple.
#[must_use]
pub fn derived_link_name(source: &QualName, target: &QualName, base_local: &str) -> String {
    alloc::format!("{base_local}__{}__{}", mangle(source), mangle(target))
}

/// Create and register an automatic atom for a field with inline modifiers.
///
/// The new atom lives in the host's module, is based on the originally
/// referenced atom and carries the inline modifiers and the field default.
/// Returns the qualified name the field's atom reference must be rewritten
/// to.
///
/// # Errors
///
/// Fails when registration collides with an existing local declaration.
pub fn synthesize_inline_atom(
    ctx: &mut ResolverContext<'_>,
    host_name: &QualName,
    field: &str,
    base: QualName,
    default: Option<RawValue>,
    mods: Vec<AtomMod>,
) -> Result<QualName, SchemaError> {
    let local = inline_atom_name(host_name.local(), field);
    let name = QualName::new(host_name.module(), &local);

    let mut atom = Atom::new(name.clone());
    atom.base = Some(AtomBase::Named(base));
    atom.default = default;
    atom.automatic = true;
    atom.backend = ctx.backend.clone();
    atom.mods = mods;

    ctx.scope.register_local(name.clone(), Category::Atom)?;
    ctx.schema.add_atom(atom)?;

    trace_event!(
        ctx.tracer,
        TraceLevel::Debug,
        TraceEvent::AtomSynthesized {
            name: &local,
            host: host_name.local(),
            field,
        }
    );

    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inline_atom_name_encodes_host_and_field() {
        assert_eq!(inline_atom_name("Person", "nickname"), "__Person__nickname");
    }

    #[test]
    fn test_derived_link_name_is_deterministic() {
        let source = QualName::new("app", "Person");
        let target = QualName::new("std", "str");
        let a = derived_link_name(&source, &target, "nickname");
        let b = derived_link_name(&source, &target, "nickname");
        assert_eq!(a, b);
        assert_eq!(a, "nickname__app_Person__std_str");
    }

    #[test]
    fn test_derived_link_name_distinguishes_targets() {
        let source = QualName::new("app", "Person");
        let t1 = QualName::new("app", "Article");
        let t2 = QualName::new("app", "Comment");
        assert_ne!(
            derived_link_name(&source, &t1, "wrote"),
            derived_link_name(&source, &t2, "wrote")
        );
    }

    #[test]
    fn test_mangle_flattens_dotted_modules() {
        // `acme.billing.Invoice` and a hypothetical `acme` module defining
        // `billing_Invoice` must not collide with each other via mangling of
        // a different (source, target) pair; the triple keeps them apart.
        let qn = QualName::new("acme.billing", "Invoice");
        assert_eq!(mangle(&qn), "acme_billing_Invoice");
    }
}
