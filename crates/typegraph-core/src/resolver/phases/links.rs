//! Link reading, ordering and merging.

use crate::error::SchemaError;
use crate::graph::DepGraph;
use crate::model::{
    Category, IterFilter, ItemRef, Link, LinkBase, LinkId, LinkProperty, PropertyAtomRef, QualName,
    Schema, SourceRef, TargetRef,
};
use crate::raw::{builtins, RawLink, RawValue};
use crate::resolver::context::ResolverContext;
use crate::resolver::phases::synth::synthesize_inline_atom;
use crate::resolver::tracing::{Phase, TraceEvent, TraceLevel, Tracer};
use crate::trace_event;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Read a module's link records.
///
/// Qualifies the link and each of its properties (`module.link__property`),
/// normalizes property atom references, synthesizes automatic atoms for
/// properties carrying inline modifiers, and injects the canonical root link
/// as base for links that declare none.
///
/// # Errors
///
/// Fails on malformed records, duplicate local declarations and name
/// normalization errors.
pub fn read_links(
    ctx: &mut ResolverContext<'_>,
    records: &BTreeMap<String, RawValue>,
) -> Result<(), SchemaError> {
    trace_event!(
        ctx.tracer,
        TraceLevel::Info,
        TraceEvent::PhaseStart {
            phase: Phase::ReadLinks,
        }
    );

    let mut decls: Vec<(QualName, RawLink)> = Vec::with_capacity(records.len());
    for (short, value) in records {
        let decl = RawLink::from_value(short, value)?;
        let name = ctx.scope.qualify(short);
        ctx.scope.register_local(name.clone(), Category::Link)?;

        let mut link = Link::new(name.clone());
        link.title = decl.title.clone();
        link.description = decl.description.clone();
        link.is_abstract = decl.is_abstract;
        link.mapping = decl.mapping;
        link.required = decl.required;

        for (prop_short, prop_decl) in &decl.properties {
            let atom_qn = ctx
                .scope
                .normalize(ctx.schema, ctx.host, &prop_decl.atom, false)?;
            let atom_qn = if prop_decl.mods.is_empty() {
                atom_qn
            } else {
                synthesize_inline_atom(
                    ctx,
                    &name,
                    prop_short,
                    atom_qn,
                    prop_decl.default.clone(),
                    prop_decl.mods.clone(),
                )?
            };
            let prop_name = QualName::new(
                ctx.scope.module(),
                &alloc::format!("{short}__{prop_short}"),
            );
            link.properties.insert(
                prop_name.clone(),
                LinkProperty {
                    name: prop_name,
                    atom: PropertyAtomRef::Named(atom_qn),
                    default: prop_decl.default.clone(),
                    title: prop_decl.title.clone(),
                    description: prop_decl.description.clone(),
                },
            );
        }

        ctx.schema.add_link(link)?;
        let rendered = alloc::format!("{name}");
        trace_event!(
            ctx.tracer,
            TraceLevel::Debug,
            TraceEvent::Registered {
                category: Category::Link,
                name: &rendered,
            }
        );
        decls.push((name, decl));
    }

    let root = builtins::root_link_name();
    for (name, decl) in &decls {
        let mut bases = Vec::with_capacity(decl.extends.len().max(1));
        for base_raw in &decl.extends {
            let base_qn = ctx.scope.normalize(ctx.schema, ctx.host, base_raw, false)?;
            bases.push(LinkBase::Named(base_qn));
        }
        if bases.is_empty() && *name != root {
            // Every link hierarchy hangs off the canonical root.
            trace_event!(
                ctx.tracer,
                TraceLevel::Debug,
                TraceEvent::RootInjected {
                    category: Category::Link,
                    name: name.local(),
                }
            );
            bases.push(LinkBase::Named(root.clone()));
        }
        if let Some(id) = ctx.schema.link_id(name) {
            if let Some(link) = ctx.schema.get_link_mut(id) {
                link.base = bases;
            }
        }
    }

    trace_event!(
        ctx.tracer,
        TraceLevel::Info,
        TraceEvent::PhaseEnd {
            phase: Phase::ReadLinks,
        }
    );
    Ok(())
}

fn unresolved(reference: &QualName, scope: &QualName) -> SchemaError {
    SchemaError::UnresolvedName {
        name: reference.to_string(),
        module: scope.module().to_string(),
    }
}

/// Order all links of the schema and merge base attributes into children.
///
/// The pre-pass rewrites every property atom, source, target and base
/// reference to a resolved identity and rejects an implicit derivative whose
/// atomic vocabulary link was attached to a concept target. Returns the
/// dependency order used by consolidation.
///
/// # Errors
///
/// Fails with [`SchemaError::StructuralCycle`] on cyclic bases,
/// [`SchemaError::UnresolvedName`] on dangling references and
/// [`SchemaError::CategoryConflict`] on atomic-vocabulary misuse.
pub fn order_links(
    schema: &mut Schema,
    tracer: &mut dyn Tracer,
) -> Result<Vec<QualName>, SchemaError> {
    trace_event!(
        tracer,
        TraceLevel::Info,
        TraceEvent::PhaseStart {
            phase: Phase::OrderLinks,
        }
    );

    let names: Vec<QualName> = schema
        .iter_category(Category::Link, IterFilter::all())
        .cloned()
        .collect();

    let mut graph = DepGraph::new();
    for name in &names {
        let Some(id) = schema.link_id(name) else {
            continue;
        };

        resolve_link_refs(schema, name, id)?;

        // An implicitly defined atomic link cannot be used to link to a
        // concept.
        let Some(link) = schema.get_link(id) else {
            continue;
        };
        if link.implicit_derivative && matches!(link.target, Some(TargetRef::Concept(_))) {
            if let Some(LinkBase::Resolved(vocab_id)) = link.base.first() {
                if let Some(vocab) = schema.get_link(*vocab_id) {
                    if vocab.is_atomic {
                        return Err(SchemaError::CategoryConflict {
                            owner: link.name.clone(),
                            link_name: vocab.name.local().to_string(),
                        });
                    }
                }
            }
        }

        let merge: Vec<QualName> = link
            .base
            .iter()
            .filter_map(|base| match base {
                LinkBase::Resolved(base_id) => {
                    schema.get_link(*base_id).map(|b| b.name.clone())
                }
                LinkBase::Named(_) => None,
            })
            .collect();
        graph.add_node(name.clone(), merge, Vec::new());
    }

    let order = graph.order().map_err(|err| SchemaError::StructuralCycle {
        category: Category::Link,
        members: err.members,
    })?;

    for name in &order {
        let parents: Vec<LinkId> = graph
            .merge_parents(name)
            .iter()
            .filter_map(|parent| schema.link_id(parent))
            .collect();
        if parents.is_empty() {
            continue;
        }
        let Some(id) = schema.link_id(name) else {
            continue;
        };
        merge_link(schema, id, &parents);
        trace_event!(
            tracer,
            TraceLevel::Debug,
            TraceEvent::Merged {
                category: Category::Link,
                name: name.local(),
                parents: parents.len(),
            }
        );
    }

    trace_event!(
        tracer,
        TraceLevel::Info,
        TraceEvent::PhaseEnd {
            phase: Phase::OrderLinks,
        }
    );
    Ok(order)
}

/// Rewrite a link's property atoms, source, target and bases to identities.
fn resolve_link_refs(
    schema: &mut Schema,
    name: &QualName,
    id: LinkId,
) -> Result<(), SchemaError> {
    // Property atoms
    let mut prop_updates = Vec::new();
    if let Some(link) = schema.get_link(id) {
        for (prop_name, prop) in &link.properties {
            if let PropertyAtomRef::Named(atom_qn) = &prop.atom {
                let atom_id = schema
                    .atom_id(atom_qn)
                    .ok_or_else(|| unresolved(atom_qn, name))?;
                prop_updates.push((prop_name.clone(), atom_id));
            }
        }
    }
    if !prop_updates.is_empty() {
        if let Some(link) = schema.get_link_mut(id) {
            for (prop_name, atom_id) in prop_updates {
                if let Some(prop) = link.properties.get_mut(&prop_name) {
                    prop.atom = PropertyAtomRef::Resolved(atom_id);
                }
            }
        }
    }

    // Source
    let source_name = match schema.get_link(id).and_then(|l| l.source.clone()) {
        Some(SourceRef::Named(qn)) => Some(qn),
        _ => None,
    };
    if let Some(source_qn) = source_name {
        let concept_id = schema
            .concept_id(&source_qn)
            .ok_or_else(|| unresolved(&source_qn, name))?;
        if let Some(link) = schema.get_link_mut(id) {
            link.source = Some(SourceRef::Resolved(concept_id));
        }
    }

    // Target
    let target_name = match schema.get_link(id).and_then(|l| l.target.clone()) {
        Some(TargetRef::Named(qn)) => Some(qn),
        _ => None,
    };
    if let Some(target_qn) = target_name {
        let target = match schema.get(&target_qn) {
            Some(ItemRef::Atom(atom_id)) => TargetRef::Atom(atom_id),
            Some(ItemRef::Concept(concept_id)) => TargetRef::Concept(concept_id),
            Some(ItemRef::Link(_)) => {
                return Err(SchemaError::InvalidDeclaration {
                    name: name.to_string(),
                    detail: String::from("link target must be an atom or a concept"),
                });
            }
            None => return Err(unresolved(&target_qn, name)),
        };
        if let Some(link) = schema.get_link_mut(id) {
            link.target = Some(target);
        }
    }

    // Bases
    let base_refs = schema.get_link(id).map(|l| l.base.clone()).unwrap_or_default();
    let mut resolved = Vec::with_capacity(base_refs.len());
    for base in base_refs {
        match base {
            LinkBase::Named(base_qn) => {
                let base_id = schema
                    .link_id(&base_qn)
                    .ok_or_else(|| unresolved(&base_qn, name))?;
                resolved.push(LinkBase::Resolved(base_id));
            }
            LinkBase::Resolved(base_id) => resolved.push(LinkBase::Resolved(base_id)),
        }
    }
    if let Some(link) = schema.get_link_mut(id) {
        link.base = resolved;
    }
    Ok(())
}

/// Merge resolved parents into a link, left to right.
///
/// Property sets union by qualified name with a child property of the same
/// short name overriding an inherited one; mapping and required flag are
/// inherited unless the child sets its own; source and target are left as
/// already-resolved identities.
fn merge_link(schema: &mut Schema, child: LinkId, parents: &[LinkId]) {
    let child_shorts: BTreeSet<String> = schema
        .get_link(child)
        .map(|link| {
            link.properties
                .values()
                .map(|p| p.short_name().to_string())
                .collect()
        })
        .unwrap_or_default();

    let mut inherited_mapping = None;
    let mut inherited_required = None;
    let mut inherited_props: Vec<LinkProperty> = Vec::new();
    let mut taken: BTreeSet<String> = BTreeSet::new();

    for parent_id in parents {
        let Some(parent) = schema.get_link(*parent_id) else {
            continue;
        };
        if inherited_mapping.is_none() {
            inherited_mapping = parent.mapping;
        }
        if inherited_required.is_none() {
            inherited_required = parent.required;
        }
        for prop in parent.properties.values() {
            let short = prop.short_name().to_string();
            if child_shorts.contains(&short) || taken.contains(&short) {
                continue;
            }
            taken.insert(short);
            inherited_props.push(prop.clone());
        }
    }

    let Some(link) = schema.get_link_mut(child) else {
        return;
    };
    if link.mapping.is_none() {
        link.mapping = inherited_mapping;
    }
    if link.required.is_none() {
        link.required = inherited_required;
    }
    for prop in inherited_props {
        link.properties.insert(prop.name.clone(), prop);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::NoHostTypes;
    use crate::model::{Atom, Mapping};
    use crate::resolver::scope::ModuleScope;
    use crate::resolver::tracing::NoopTracer;
    use alloc::vec;

    fn map(entries: &[(&str, RawValue)]) -> RawValue {
        RawValue::Map(
            entries
                .iter()
                .map(|(k, v)| (String::from(*k), v.clone()))
                .collect(),
        )
    }

    fn seeded_schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .add_atom(Atom::new(QualName::new("std", "str")))
            .unwrap();
        let mut root = Link::new(builtins::root_link_name());
        root.is_abstract = true;
        root.mapping = Some(Mapping::ManyToMany);
        root.required = Some(false);
        schema.add_link(root).unwrap();
        schema
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
        read_links(&mut ctx, records)
    }

    #[test]
    fn test_read_injects_root_base() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(String::from("knows"), map(&[]));
        read(&mut schema, &records).unwrap();

        let link = schema
            .get_link(schema.link_id(&QualName::new("app", "knows")).unwrap())
            .unwrap();
        assert_eq!(
            link.base,
            vec![LinkBase::Named(builtins::root_link_name())]
        );
    }

    #[test]
    fn test_property_names_and_inline_atom() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(
            String::from("annotated"),
            map(&[(
                "properties",
                map(&[(
                    "note",
                    map(&[
                        ("atom", RawValue::Str("str".into())),
                        (
                            "mods",
                            RawValue::List(vec![map(&[("max-length", RawValue::Int(80))])]),
                        ),
                    ]),
                )]),
            )]),
        );
        read(&mut schema, &records).unwrap();

        let link = schema
            .get_link(schema.link_id(&QualName::new("app", "annotated")).unwrap())
            .unwrap();
        let prop_name = QualName::new("app", "annotated__note");
        let prop = &link.properties[&prop_name];
        assert_eq!(prop.short_name(), "note");

        // The inline mods produced an automatic atom and re-pointed the
        // property at it.
        let auto_name = QualName::new("app", "__annotated__note");
        assert_eq!(prop.atom, PropertyAtomRef::Named(auto_name.clone()));
        let auto = schema.get_atom(schema.atom_id(&auto_name).unwrap()).unwrap();
        assert!(auto.automatic);
        assert_eq!(
            auto.base,
            Some(crate::model::AtomBase::Named(QualName::new("std", "str")))
        );
    }

    #[test]
    fn test_order_inherits_mapping_and_properties() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(
            String::from("annotated"),
            map(&[(
                "properties",
                map(&[("note", RawValue::Str("str".into()))]),
            )]),
        );
        records.insert(
            String::from("endorses"),
            map(&[("extends", RawValue::Str("annotated".into()))]),
        );
        read(&mut schema, &records).unwrap();

        let mut tracer = NoopTracer;
        let order = order_links(&mut schema, &mut tracer).unwrap();

        let parent = QualName::new("app", "annotated");
        let child = QualName::new("app", "endorses");
        assert!(
            order.iter().position(|n| *n == parent).unwrap()
                < order.iter().position(|n| *n == child).unwrap()
        );

        let child_link = schema.get_link(schema.link_id(&child).unwrap()).unwrap();
        // Mapping flows down from std.link through the chain.
        assert_eq!(child_link.mapping, Some(Mapping::ManyToMany));
        assert_eq!(child_link.required, Some(false));
        // The property set was unioned in.
        assert!(child_link
            .properties
            .contains_key(&QualName::new("app", "annotated__note")));
        // And its atom reference is a resolved identity.
        let prop = &child_link.properties[&QualName::new("app", "annotated__note")];
        assert!(matches!(prop.atom, PropertyAtomRef::Resolved(_)));
    }

    #[test]
    fn test_child_property_overrides_inherited_short_name() {
        let mut schema = seeded_schema();
        let mut records = BTreeMap::new();
        records.insert(
            String::from("annotated"),
            map(&[(
                "properties",
                map(&[("note", RawValue::Str("str".into()))]),
            )]),
        );
        records.insert(
            String::from("endorses"),
            map(&[
                ("extends", RawValue::Str("annotated".into())),
                (
                    "properties",
                    map(&[("note", RawValue::Str("str".into()))]),
                ),
            ]),
        );
        read(&mut schema, &records).unwrap();

        let mut tracer = NoopTracer;
        order_links(&mut schema, &mut tracer).unwrap();

        let child = schema
            .get_link(schema.link_id(&QualName::new("app", "endorses")).unwrap())
            .unwrap();
        // Only the child's own property survives under the short name.
        assert!(child
            .properties
            .contains_key(&QualName::new("app", "endorses__note")));
        assert!(!child
            .properties
            .contains_key(&QualName::new("app", "annotated__note")));
    }

    #[test]
    fn test_order_rejects_unknown_base() {
        let mut schema = seeded_schema();
        let mut link = Link::new(QualName::new("app", "broken"));
        link.base = vec![LinkBase::Named(QualName::new("app", "missing"))];
        schema.add_link(link).unwrap();

        let mut tracer = NoopTracer;
        let err = order_links(&mut schema, &mut tracer).unwrap_err();
        assert!(matches!(err, SchemaError::UnresolvedName { .. }));
    }

    #[test]
    fn test_link_base_cycle() {
        let mut schema = seeded_schema();
        let mut a = Link::new(QualName::new("app", "a"));
        a.base = vec![LinkBase::Named(QualName::new("app", "b"))];
        schema.add_link(a).unwrap();
        let mut b = Link::new(QualName::new("app", "b"));
        b.base = vec![LinkBase::Named(QualName::new("app", "a"))];
        schema.add_link(b).unwrap();

        let mut tracer = NoopTracer;
        let err = order_links(&mut schema, &mut tracer).unwrap_err();
        assert!(matches!(
            err,
            SchemaError::StructuralCycle {
                category: Category::Link,
                ..
            }
        ));
    }
}
