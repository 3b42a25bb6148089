//! Atom reading, ordering and merging.

use crate::error::SchemaError;
use crate::graph::DepGraph;
use crate::model::{
    Atom, AtomBase, AtomId, Category, IterFilter, QualName, Schema,
};
use crate::raw::{builtins, RawAtom, RawValue};
use crate::resolver::context::ResolverContext;
use crate::resolver::tracing::{Phase, TraceEvent, TraceLevel, Tracer};
use crate::trace_event;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Read a module's atom records: qualify names, apply the module backend tag,
/// register into the local and global indexes, then normalize base
/// references (host-type bases allowed).
///
/// # Errors
///
/// Fails on malformed records, duplicate local declarations and name
/// normalization errors.
pub fn read_atoms(
    ctx: &mut ResolverContext<'_>,
    records: &BTreeMap<String, RawValue>,
) -> Result<(), SchemaError> {
    trace_event!(
        ctx.tracer,
        TraceLevel::Info,
        TraceEvent::PhaseStart {
            phase: Phase::ReadAtoms,
        }
    );

    let mut decls: Vec<(QualName, RawAtom)> = Vec::with_capacity(records.len());
    for (short, value) in records {
        let decl = RawAtom::from_value(short, value)?;
        let name = ctx.scope.qualify(short);
        ctx.scope.register_local(name.clone(), Category::Atom)?;

        let mut atom = Atom::new(name.clone());
        atom.default = decl.default.clone();
        atom.title = decl.title.clone();
        atom.description = decl.description.clone();
        atom.is_abstract = decl.is_abstract;
        atom.backend = ctx.backend.clone();
        atom.mods = decl.mods.clone();
        ctx.schema.add_atom(atom)?;

        let rendered = alloc::format!("{name}");
        trace_event!(
            ctx.tracer,
            TraceLevel::Debug,
            TraceEvent::Registered {
                category: Category::Atom,
                name: &rendered,
            }
        );
        decls.push((name, decl));
    }

    // Bases can only be normalized once every atom of the module is
    // registered, so forward references within the module resolve.
    for (name, decl) in &decls {
        let Some(base_raw) = &decl.extends else {
            continue;
        };
        let base_qn = ctx.scope.normalize(ctx.schema, ctx.host, base_raw, true)?;
        let base = if ctx.schema.get(&base_qn).is_some() {
            AtomBase::Named(base_qn)
        } else if ctx.host.resolve(&base_qn).is_some() {
            AtomBase::Host(base_qn)
        } else {
            // Qualified reference into a module this load cannot see into
            // yet; the ordering pass resolves or rejects it.
            AtomBase::Named(base_qn)
        };
        if let Some(id) = ctx.schema.atom_id(name) {
            if let Some(atom) = ctx.schema.get_atom_mut(id) {
                atom.base = Some(base);
            }
        }
    }

    trace_event!(
        ctx.tracer,
        TraceLevel::Info,
        TraceEvent::PhaseEnd {
            phase: Phase::ReadAtoms,
        }
    );
    Ok(())
}

/// Order all atoms of the schema and merge base attributes into children.
///
/// Schema-atom bases are merge edges; builtin ancestors only order. Returns
/// the dependency order used by consolidation.
///
/// # Errors
///
/// Fails with [`SchemaError::StructuralCycle`] on cyclic bases and
/// [`SchemaError::UnresolvedName`] when a base reference has no definition.
pub fn order_atoms(
    schema: &mut Schema,
    tracer: &mut dyn Tracer,
) -> Result<Vec<QualName>, SchemaError> {
    trace_event!(
        tracer,
        TraceLevel::Info,
        TraceEvent::PhaseStart {
            phase: Phase::OrderAtoms,
        }
    );

    let names: Vec<QualName> = schema
        .iter_category(Category::Atom, IterFilter::all())
        .cloned()
        .collect();

    let mut graph = DepGraph::new();
    for name in &names {
        let Some(id) = schema.atom_id(name) else {
            continue;
        };
        let base = schema.get_atom(id).and_then(|atom| atom.base.clone());

        let mut merge = Vec::new();
        let mut deps = Vec::new();
        match base {
            Some(AtomBase::Named(base_name)) => {
                let Some(base_id) = schema.atom_id(&base_name) else {
                    return Err(SchemaError::UnresolvedName {
                        name: base_name.to_string(),
                        module: name.module().to_string(),
                    });
                };
                if let Some(atom) = schema.get_atom_mut(id) {
                    atom.base = Some(AtomBase::Resolved(base_id));
                }
                if builtins::is_builtin(&base_name) {
                    deps.push(base_name);
                } else {
                    merge.push(base_name);
                }
            }
            Some(AtomBase::Resolved(base_id)) => {
                // Already resolved by an earlier load; re-derive the edge.
                if let Some(base_atom) = schema.get_atom(base_id) {
                    let base_name = base_atom.name.clone();
                    if builtins::is_builtin(&base_name) {
                        deps.push(base_name);
                    } else {
                        merge.push(base_name);
                    }
                }
            }
            Some(AtomBase::Host(_)) | None => {}
        }
        graph.add_node(name.clone(), merge, deps);
    }

    let order = graph.order().map_err(|err| SchemaError::StructuralCycle {
        category: Category::Atom,
        members: err.members,
    })?;

    for name in &order {
        let parents: Vec<AtomId> = graph
            .merge_parents(name)
            .iter()
            .filter_map(|parent| schema.atom_id(parent))
            .collect();
        if parents.is_empty() {
            continue;
        }
        let Some(id) = schema.atom_id(name) else {
            continue;
        };
        merge_atom(schema, id, &parents);
        trace_event!(
            tracer,
            TraceLevel::Debug,
            TraceEvent::Merged {
                category: Category::Atom,
                name: name.local(),
                parents: parents.len(),
            }
        );
    }

    trace_event!(
        tracer,
        TraceLevel::Info,
        TraceEvent::PhaseEnd {
            phase: Phase::OrderAtoms,
        }
    );
    Ok(order)
}

/// Merge resolved parents into an atom, left to right.
///
/// The child keeps its own default and modifiers when it has any;
/// abstractness is never inherited.
fn merge_atom(schema: &mut Schema, child: AtomId, parents: &[AtomId]) {
    let mut inherited_default = None;
    let mut inherited_mods: Option<Vec<_>> = None;
    for parent_id in parents {
        let Some(parent) = schema.get_atom(*parent_id) else {
            continue;
        };
        if inherited_default.is_none() && parent.default.is_some() {
            inherited_default = parent.default.clone();
        }
        if inherited_mods.is_none() && !parent.mods.is_empty() {
            inherited_mods = Some(parent.mods.clone());
        }
    }

    let Some(child) = schema.get_atom_mut(child) else {
        return;
    };
    if child.default.is_none() {
        child.default = inherited_default;
    }
    if child.mods.is_empty() {
        if let Some(mods) = inherited_mods {
            child.mods = mods;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoHostTypes;
    use crate::model::AtomMod;
    use crate::resolver::scope::ModuleScope;
    use crate::resolver::tracing::NoopTracer;
    use alloc::vec;

    fn seeded_schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .add_atom(Atom::new(QualName::new("std", "str")))
            .unwrap();
        schema
    }

    fn atom_record(entries: &[(&str, RawValue)]) -> RawValue {
        RawValue::Map(
            entries
                .iter()
                .map(|(k, v)| (String::from(*k), v.clone()))
                .collect(),
        )
    }

    fn read(schema: &mut Schema, records: &BTreeMap<String, RawValue>) -> Result<(), SchemaError> {
        let mut tracer = NoopTracer;
        let mut ctx = ResolverContext::new(
            schema,
            ModuleScope::new("app", BTreeMap::new()),
            &NoHostTypes,
            None,
            &mut tracer,
        );
        read_atoms(&mut ctx, records)
    }

    #[test]
    fn test_read_registers_and_normalizes_base() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(
            String::from("str_short"),
            atom_record(&[
                ("extends", RawValue::Str("str".into())),
                (
                    "mods",
                    RawValue::List(vec![atom_record(&[("max-length", RawValue::Int(10))])]),
                ),
            ]),
        );

        read(&mut schema, &records).unwrap();

        let id = schema.atom_id(&QualName::new("app", "str_short")).unwrap();
        let atom = schema.get_atom(id).unwrap();
        assert_eq!(
            atom.base,
            Some(AtomBase::Named(QualName::new("std", "str")))
        );
        assert_eq!(atom.mods, vec![AtomMod::MaxLength(10)]);
    }

    #[test]
    fn test_order_resolves_identity_and_inherits() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(
            String::from("str_short"),
            atom_record(&[
                ("extends", RawValue::Str("str".into())),
                ("default", RawValue::Str("-".into())),
                (
                    "mods",
                    RawValue::List(vec![atom_record(&[("max-length", RawValue::Int(10))])]),
                ),
            ]),
        );
        records.insert(
            String::from("str_shorter"),
            atom_record(&[("extends", RawValue::Str("str_short".into()))]),
        );
        read(&mut schema, &records).unwrap();

        let mut tracer = NoopTracer;
        let order = order_atoms(&mut schema, &mut tracer).unwrap();

        let parent = QualName::new("app", "str_short");
        let child = QualName::new("app", "str_shorter");
        let parent_pos = order.iter().position(|n| *n == parent).unwrap();
        let child_pos = order.iter().position(|n| *n == child).unwrap();
        assert!(parent_pos < child_pos);

        let parent_id = schema.atom_id(&parent).unwrap();
        let child_atom = schema.get_atom(schema.atom_id(&child).unwrap()).unwrap();
        assert_eq!(child_atom.base_id(), Some(parent_id));
        // Inherited from the parent
        assert_eq!(child_atom.default, Some(RawValue::Str("-".into())));
        assert_eq!(child_atom.mods, vec![AtomMod::MaxLength(10)]);
    }

    #[test]
    fn test_child_overrides_win() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(
            String::from("a"),
            atom_record(&[
                ("extends", RawValue::Str("str".into())),
                (
                    "mods",
                    RawValue::List(vec![atom_record(&[("max-length", RawValue::Int(10))])]),
                ),
            ]),
        );
        records.insert(
            String::from("b"),
            atom_record(&[
                ("extends", RawValue::Str("a".into())),
                (
                    "mods",
                    RawValue::List(vec![atom_record(&[("max-length", RawValue::Int(5))])]),
                ),
            ]),
        );
        read(&mut schema, &records).unwrap();

        let mut tracer = NoopTracer;
        order_atoms(&mut schema, &mut tracer).unwrap();

        let b = schema
            .get_atom(schema.atom_id(&QualName::new("app", "b")).unwrap())
            .unwrap();
        assert_eq!(b.mods, vec![AtomMod::MaxLength(5)]);
    }

    #[test]
    fn test_abstract_not_inherited() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(
            String::from("a"),
            atom_record(&[
                ("extends", RawValue::Str("str".into())),
                ("abstract", RawValue::Bool(true)),
            ]),
        );
        records.insert(
            String::from("b"),
            atom_record(&[("extends", RawValue::Str("a".into()))]),
        );
        read(&mut schema, &records).unwrap();

        let mut tracer = NoopTracer;
        order_atoms(&mut schema, &mut tracer).unwrap();

        let b = schema
            .get_atom(schema.atom_id(&QualName::new("app", "b")).unwrap())
            .unwrap();
        assert!(!b.is_abstract);
    }

    #[test]
    fn test_base_cycle_fails_with_both_members() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(
            String::from("a"),
            atom_record(&[("extends", RawValue::Str("b".into()))]),
        );
        records.insert(
            String::from("b"),
            atom_record(&[("extends", RawValue::Str("a".into()))]),
        );
        read(&mut schema, &records).unwrap();

        let mut tracer = NoopTracer;
        let err = order_atoms(&mut schema, &mut tracer).unwrap_err();
        match err {
            SchemaError::StructuralCycle { category, members } => {
                assert_eq!(category, Category::Atom);
                let mut members = members;
                members.sort();
                assert_eq!(
                    members,
                    vec![QualName::new("app", "a"), QualName::new("app", "b")]
                );
            }
            other => panic!("expected StructuralCycle, got {other:?}"),
        }
    }

    #[test]
    fn test_plain_atom_merges_to_itself() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(String::from("plain"), atom_record(&[]));
        read(&mut schema, &records).unwrap();

        let name = QualName::new("app", "plain");
        let before = schema.get_atom(schema.atom_id(&name).unwrap()).unwrap().clone();

        let mut tracer = NoopTracer;
        order_atoms(&mut schema, &mut tracer).unwrap();

        let after = schema.get_atom(schema.atom_id(&name).unwrap()).unwrap();
        assert_eq!(*after, before);
    }
}
