//! Concept reading, ordering and merging.

use crate::error::SchemaError;
use crate::graph::DepGraph;
use crate::host::HostCapability;
use crate::model::{
    Category, Concept, ConceptBase, ConceptId, IterFilter, Link, LinkBase, LinkId, Mapping,
    QualName, Schema, SourceRef, TargetRef,
};
use crate::raw::{builtins, RawConcept, RawConceptLink, RawValue};
use crate::resolver::context::ResolverContext;
use crate::resolver::phases::synth::{derived_link_name, synthesize_inline_atom};
use crate::resolver::tracing::{Phase, TraceEvent, TraceLevel, Tracer};
use crate::trace_event;
use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

/// Read a module's concept records.
///
/// Qualifies names, separates schema bases from opaque host bases (checking
/// the entity capability), injects the canonical root concept for concepts
/// without schema bases, and derives a per-edge implicit link for every
/// own-link declaration.
///
/// # Errors
///
/// Fails on malformed records, duplicate local declarations, name
/// normalization errors and host bases without the entity capability.
pub fn read_concepts(
    ctx: &mut ResolverContext<'_>,
    records: &BTreeMap<String, RawValue>,
) -> Result<(), SchemaError> {
    trace_event!(
        ctx.tracer,
        TraceLevel::Info,
        TraceEvent::PhaseStart {
            phase: Phase::ReadConcepts,
        }
    );

    let mut decls: Vec<(QualName, RawConcept)> = Vec::with_capacity(records.len());
    for (short, value) in records {
        let decl = RawConcept::from_value(short, value)?;
        let name = ctx.scope.qualify(short);
        ctx.scope.register_local(name.clone(), Category::Concept)?;

        let mut concept = Concept::new(name.clone());
        concept.is_abstract = decl.is_abstract;
        concept.title = decl.title.clone();
        concept.description = decl.description.clone();
        concept.backend = ctx.backend.clone();
        ctx.schema.add_concept(concept)?;

        let rendered = alloc::format!("{name}");
        trace_event!(
            ctx.tracer,
            TraceLevel::Debug,
            TraceEvent::Registered {
                category: Category::Concept,
                name: &rendered,
            }
        );
        decls.push((name, decl));
    }

    let root = builtins::root_concept_name();
    for (name, decl) in &decls {
        let mut schema_bases: Vec<ConceptBase> = Vec::new();
        let mut host_bases: Vec<QualName> = Vec::new();
        for base_raw in &decl.extends {
            let base_qn = ctx.scope.normalize(ctx.schema, ctx.host, base_raw, true)?;
            match ctx.schema.category_of(&base_qn) {
                Some(Category::Concept) => schema_bases.push(ConceptBase::Named(base_qn)),
                Some(other) => {
                    return Err(SchemaError::InvalidDeclaration {
                        name: name.to_string(),
                        detail: alloc::format!("concept base `{base_qn}` is a {other}"),
                    });
                }
                None => match ctx.host.resolve(&base_qn) {
                    Some(host_type) if host_type.has(HostCapability::Entity) => {
                        host_bases.push(base_qn);
                    }
                    Some(_) => {
                        return Err(SchemaError::InvalidHostBase {
                            concept: name.clone(),
                            base: base_qn,
                        });
                    }
                    // Qualified reference into an earlier load; the ordering
                    // pass resolves or rejects it.
                    None => schema_bases.push(ConceptBase::Named(base_qn)),
                },
            }
        }
        if schema_bases.is_empty() && *name != root {
            trace_event!(
                ctx.tracer,
                TraceLevel::Debug,
                TraceEvent::RootInjected {
                    category: Category::Concept,
                    name: name.local(),
                }
            );
            schema_bases.push(ConceptBase::Named(root.clone()));
        }
        if let Some(id) = ctx.schema.concept_id(name) {
            if let Some(concept) = ctx.schema.get_concept_mut(id) {
                concept.base = schema_bases;
                concept.host_bases = host_bases;
            }
        }

        for (link_name, link_decls) in &decl.links {
            for link_decl in link_decls {
                read_concept_link(ctx, name, link_name, link_decl)?;
            }
        }
    }

    trace_event!(
        ctx.tracer,
        TraceLevel::Info,
        TraceEvent::PhaseEnd {
            phase: Phase::ReadConcepts,
        }
    );
    Ok(())
}

/// Process one own-link declaration: resolve the target, find or synthesize
/// the vocabulary link, synthesize an inline atom for atom targets with
/// modifiers, then derive and register the per-edge implicit link.
fn read_concept_link(
    ctx: &mut ResolverContext<'_>,
    concept_name: &QualName,
    link_name: &str,
    decl: &RawConceptLink,
) -> Result<(), SchemaError> {
    let target_qn = ctx.scope.normalize(ctx.schema, ctx.host, &decl.target, false)?;

    let vocab_qn = match ctx
        .scope
        .normalize_or_default(ctx.schema, ctx.host, link_name, false)?
    {
        Some(qn) => match ctx.schema.category_of(&qn) {
            Some(Category::Link) => qn,
            Some(other) => {
                return Err(SchemaError::InvalidDeclaration {
                    name: concept_name.to_string(),
                    detail: alloc::format!("link name `{qn}` is bound to a {other}"),
                });
            }
            None => {
                // A qualified name whose module is known but which was never
                // defined; nothing to derive from.
                return Err(SchemaError::UnresolvedName {
                    name: link_name.to_string(),
                    module: concept_name.module().to_string(),
                });
            }
        },
        None => {
            // Unqualified and globally undefined: an inline vocabulary link
            // rooted at the canonical link.
            let qn = ctx.scope.qualify(link_name);
            let mut vocab = Link::new(qn.clone());
            vocab.base = alloc::vec![LinkBase::Named(builtins::root_link_name())];
            vocab.automatic = true;
            vocab.is_atomic =
                matches!(ctx.schema.category_of(&target_qn), Some(Category::Atom));
            ctx.scope.register_local(qn.clone(), Category::Link)?;
            ctx.schema.add_link(vocab)?;
            qn
        }
    };

    let target_is_atom = matches!(ctx.schema.category_of(&target_qn), Some(Category::Atom));
    let target_qn = if target_is_atom && !decl.mods.is_empty() {
        // Inline atom definition: the edge gets its own automatic atom.
        synthesize_inline_atom(
            ctx,
            concept_name,
            vocab_qn.local(),
            target_qn,
            decl.default.clone(),
            decl.mods.clone(),
        )?
    } else {
        target_qn
    };

    // A new implicit subclass of the vocabulary link is derived for each
    // (source, target, base-name) combination.
    let derived_local = derived_link_name(concept_name, &target_qn, vocab_qn.local());
    let derived_name = QualName::new(vocab_qn.module(), &derived_local);

    let mut derived = Link::new(derived_name.clone());
    derived.source = Some(SourceRef::Named(concept_name.clone()));
    derived.target = Some(TargetRef::Named(target_qn.clone()));
    derived.base = alloc::vec![LinkBase::Named(vocab_qn.clone())];
    derived.implicit_derivative = true;
    derived.automatic = true;
    derived.required = decl.required;
    derived.title = decl.title.clone();
    derived.description = decl.description.clone();
    derived.mapping = match decl.mapping {
        Some(mapping) => Some(mapping),
        None if target_is_atom => Some(Mapping::OneToOne),
        None => None,
    };

    ctx.scope
        .register_local(derived_name.clone(), Category::Link)?;
    let link_id = ctx.schema.add_link(derived)?;
    if let Some(concept_id) = ctx.schema.concept_id(concept_name) {
        if let Some(concept) = ctx.schema.get_concept_mut(concept_id) {
            concept.add_link(vocab_qn.local(), link_id);
        }
    }

    trace_event!(
        ctx.tracer,
        TraceLevel::Debug,
        TraceEvent::LinkDerived {
            name: &derived_local,
            source: concept_name.local(),
            target: target_qn.local(),
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

/// Order all concepts of the schema and merge inherited link sets into
/// children.
///
/// The pre-pass resolves base references, registers reverse links on target
/// concepts and validates each concept's own links; the same validation runs
/// again on every merged closure. Returns the dependency order used by
/// consolidation.
///
/// # Errors
///
/// Fails with [`SchemaError::StructuralCycle`] on cyclic bases,
/// [`SchemaError::UnresolvedName`] on dangling references,
/// [`SchemaError::InvalidCardinality`] for atom-targeted links that do not
/// map one-to-one, and [`SchemaError::CategoryConflict`] when one link name
/// is bound to both atom and concept targets.
pub fn order_concepts(
    schema: &mut Schema,
    tracer: &mut dyn Tracer,
) -> Result<Vec<QualName>, SchemaError> {
    trace_event!(
        tracer,
        TraceLevel::Info,
        TraceEvent::PhaseStart {
            phase: Phase::OrderConcepts,
        }
    );

    let names: Vec<QualName> = schema
        .iter_category(Category::Concept, IterFilter::all())
        .cloned()
        .collect();

    let mut graph = DepGraph::new();
    let mut rlink_adds: Vec<(ConceptId, String, LinkId)> = Vec::new();
    for name in &names {
        let Some(id) = schema.concept_id(name) else {
            continue;
        };

        // Resolve base references to identities.
        let bases = schema.get_concept(id).map(|c| c.base.clone()).unwrap_or_default();
        let mut resolved = Vec::with_capacity(bases.len());
        let mut merge = Vec::with_capacity(bases.len());
        for base in bases {
            let base_id = match base {
                ConceptBase::Named(base_qn) => schema
                    .concept_id(&base_qn)
                    .ok_or_else(|| unresolved(&base_qn, name))?,
                ConceptBase::Resolved(base_id) => base_id,
            };
            if let Some(base_concept) = schema.get_concept(base_id) {
                merge.push(base_concept.name.clone());
            }
            resolved.push(ConceptBase::Resolved(base_id));
        }
        if let Some(concept) = schema.get_concept_mut(id) {
            concept.base = resolved;
        }

        // Collect reverse links for concept targets.
        if let Some(concept) = schema.get_concept(id) {
            for (short, link_ids) in &concept.links {
                for link_id in link_ids {
                    if let Some(link) = schema.get_link(*link_id) {
                        if let Some(TargetRef::Concept(target_id)) = link.target {
                            rlink_adds.push((target_id, short.clone(), *link_id));
                        }
                    }
                }
            }
        }

        validate_concept_links(schema, id)?;
        graph.add_node(name.clone(), merge, Vec::new());
    }

    for (target_id, short, link_id) in rlink_adds {
        if let Some(target) = schema.get_concept_mut(target_id) {
            target.add_rlink(&short, link_id);
        }
    }

    let order = graph.order().map_err(|err| SchemaError::StructuralCycle {
        category: Category::Concept,
        members: err.members,
    })?;

    for name in &order {
        let Some(id) = schema.concept_id(name) else {
            continue;
        };
        let parents: Vec<ConceptId> = graph
            .merge_parents(name)
            .iter()
            .filter_map(|parent| schema.concept_id(parent))
            .collect();
        if !parents.is_empty() {
            merge_concept_links(schema, id, &parents);
            trace_event!(
                tracer,
                TraceLevel::Debug,
                TraceEvent::Merged {
                    category: Category::Concept,
                    name: name.local(),
                    parents: parents.len(),
                }
            );
        }
        // The merged closure must satisfy the same consistency rules as the
        // declared links.
        validate_concept_links(schema, id)?;
    }

    trace_event!(
        tracer,
        TraceLevel::Info,
        TraceEvent::PhaseEnd {
            phase: Phase::OrderConcepts,
        }
    );
    Ok(order)
}

/// Enforce per-closure consistency: atom-targeted links map one-to-one, and
/// no link name is bound to both atom and concept targets.
fn validate_concept_links(schema: &Schema, id: ConceptId) -> Result<(), SchemaError> {
    let Some(concept) = schema.get_concept(id) else {
        return Ok(());
    };
    for (short, link_ids) in &concept.links {
        let mut has_atom = false;
        let mut has_concept = false;
        for link_id in link_ids {
            let Some(link) = schema.get_link(*link_id) else {
                continue;
            };
            match link.target {
                Some(TargetRef::Atom(_)) => {
                    has_atom = true;
                    if link.mapping() != Mapping::OneToOne {
                        return Err(SchemaError::InvalidCardinality {
                            link: link.name.clone(),
                            mapping: link.mapping(),
                        });
                    }
                }
                Some(TargetRef::Concept(_)) => has_concept = true,
                _ => {}
            }
        }
        if has_atom && has_concept {
            return Err(SchemaError::CategoryConflict {
                owner: concept.name.clone(),
                link_name: short.clone(),
            });
        }
    }
    Ok(())
}

/// Merge parent own-link maps into a concept.
///
/// For each short name the union of all parent variants plus the concept's
/// own is kept, deduplicated by identity, then filtered so that when two
/// variants share a target lineage the one with the more specific source
/// survives.
fn merge_concept_links(schema: &mut Schema, child: ConceptId, parents: &[ConceptId]) {
    let mut combined: BTreeMap<String, Vec<LinkId>> = BTreeMap::new();
    for parent_id in parents {
        let Some(parent) = schema.get_concept(*parent_id) else {
            continue;
        };
        for (short, link_ids) in &parent.links {
            let entry = combined.entry(short.clone()).or_default();
            for link_id in link_ids {
                if !entry.contains(link_id) {
                    entry.push(*link_id);
                }
            }
        }
    }
    let own = schema
        .get_concept(child)
        .map(|c| c.links.clone())
        .unwrap_or_default();
    for (short, link_ids) in &own {
        let entry = combined.entry(short.clone()).or_default();
        for link_id in link_ids {
            if !entry.contains(link_id) {
                entry.push(*link_id);
            }
        }
    }

    for link_ids in combined.values_mut() {
        if link_ids.len() < 2 {
            continue;
        }
        let kept: Vec<LinkId> = link_ids
            .iter()
            .copied()
            .filter(|a| !link_ids.iter().any(|b| supersedes(schema, *b, *a)))
            .collect();
        *link_ids = kept;
    }

    if let Some(concept) = schema.get_concept_mut(child) {
        concept.links = combined;
    }
}

/// Whether variant `b` supersedes variant `a`: same target lineage, and `b`'s
/// source strictly specializes `a`'s.
fn supersedes(schema: &Schema, b: LinkId, a: LinkId) -> bool {
    if a == b {
        return false;
    }
    let (Some(link_a), Some(link_b)) = (schema.get_link(a), schema.get_link(b)) else {
        return false;
    };
    let (Some(target_a), Some(target_b)) = (&link_a.target, &link_b.target) else {
        return false;
    };
    if !targets_same_lineage(schema, target_a, target_b) {
        return false;
    }
    let (Some(source_a), Some(source_b)) = (source_id(link_a), source_id(link_b)) else {
        return false;
    };
    source_a != source_b && concept_ancestors(schema, source_b).contains(&source_a)
}

fn source_id(link: &Link) -> Option<ConceptId> {
    match link.source {
        Some(SourceRef::Resolved(id)) => Some(id),
        _ => None,
    }
}

fn targets_same_lineage(schema: &Schema, a: &TargetRef, b: &TargetRef) -> bool {
    match (a, b) {
        (TargetRef::Atom(x), TargetRef::Atom(y)) => {
            x == y
                || atom_ancestors(schema, *x).contains(y)
                || atom_ancestors(schema, *y).contains(x)
        }
        (TargetRef::Concept(x), TargetRef::Concept(y)) => {
            x == y
                || concept_ancestors(schema, *x).contains(y)
                || concept_ancestors(schema, *y).contains(x)
        }
        _ => false,
    }
}

fn atom_ancestors(schema: &Schema, id: crate::model::AtomId) -> BTreeSet<crate::model::AtomId> {
    let mut ancestors = BTreeSet::new();
    let mut current = schema.get_atom(id).and_then(crate::model::Atom::base_id);
    while let Some(ancestor) = current {
        if !ancestors.insert(ancestor) {
            break;
        }
        current = schema.get_atom(ancestor).and_then(crate::model::Atom::base_id);
    }
    ancestors
}

fn concept_ancestors(schema: &Schema, id: ConceptId) -> BTreeSet<ConceptId> {
    let mut ancestors = BTreeSet::new();
    let mut pending = alloc::vec![id];
    while let Some(current) = pending.pop() {
        let Some(concept) = schema.get_concept(current) else {
            continue;
        };
        for base in concept.base_ids() {
            if ancestors.insert(base) {
                pending.push(base);
            }
        }
    }
    ancestors
}
