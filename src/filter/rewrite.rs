//
//  rewrite.rs
//  ifcprune
//

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::FilterConfig;
use crate::error::Result;
use crate::filter::closure::closure;
use crate::filter::relations::{Patch, RelationPatcher};
use crate::filter::{FilterReport, Phase, Progress, ProgressFn};
use crate::model::{AttrValue, Entity, EntityId, GraphModel};

const CONTAINMENT: &str = "IFCRELCONTAINEDINSPATIALSTRUCTURE";
const PROGRESS_EVERY: usize = 1000;

/// Relation fates against the final keep-set, computed once and shared by
/// both strategies.
pub(crate) struct Survivors {
    unchanged: Vec<EntityId>,
    trimmed: Vec<(EntityId, Vec<AttrValue>)>,
    dropped: Vec<EntityId>,
}

pub(crate) fn evaluate_relations(
    graph: &GraphModel,
    keep: &HashSet<EntityId>,
    patcher: &RelationPatcher,
) -> Survivors {
    let mut survivors = Survivors {
        unchanged: Vec::new(),
        trimmed: Vec::new(),
        dropped: Vec::new(),
    };

    for entity in graph.iter() {
        // Relations already in the keep-set (voids propagation, or dragged
        // in by closure) are retained as-is; their references are closed.
        if keep.contains(&entity.id) {
            continue;
        }
        if !patcher.is_relation(&entity.ty) {
            continue;
        }
        match patcher.patch(entity, keep) {
            Patch::Keep => survivors.unchanged.push(entity.id),
            Patch::Trim(attrs) => survivors.trimmed.push((entity.id, attrs)),
            Patch::Drop => survivors.dropped.push(entity.id),
        }
    }

    debug!(
        unchanged = survivors.unchanged.len(),
        trimmed = survivors.trimmed.len(),
        dropped = survivors.dropped.len(),
        "relations patched"
    );
    survivors
}

/// Every reference still held by the surviving relations, trimmed slots
/// included. Surviving relations are not closure members themselves, so
/// their auxiliary targets (owner history, property definitions,
/// connection geometry) must be pulled into the keep-set explicitly.
fn survivor_refs(graph: &GraphModel, survivors: &Survivors) -> Vec<EntityId> {
    let mut refs = Vec::new();
    for &id in &survivors.unchanged {
        if let Ok(entity) = graph.get(id) {
            entity.for_each_ref(&mut |r| refs.push(r));
        }
    }
    for (_, attrs) in &survivors.trimmed {
        for attr in attrs {
            attr.for_each_ref(&mut |r| refs.push(r));
        }
    }
    refs
}

fn emit_progress(progress: Option<&ProgressFn>, phase: Phase, done: usize, total: usize) {
    if let Some(callback) = progress {
        if done % PROGRESS_EVERY == 0 || done == total {
            callback(&Progress { phase, done, total });
        }
    }
}

/// Delete-in-place strategy: repair relations, then delete everything
/// outside the keep-set in descending id order. Best-effort: a removal the
/// store refuses is skipped and counted, never fatal.
pub fn subtractive(
    graph: &mut GraphModel,
    mut keep: HashSet<EntityId>,
    patcher: &RelationPatcher,
    report: &mut FilterReport,
    progress: Option<&ProgressFn>,
) {
    let survivors = evaluate_relations(graph, &keep, patcher);

    for (id, attrs) in &survivors.trimmed {
        if let Ok(entity) = graph.get_mut(*id) {
            entity.attrs = attrs.clone();
        }
    }
    report.relations_trimmed += survivors.trimmed.len();
    report.relations_dropped += survivors.dropped.len();

    keep.extend(survivors.unchanged.iter().copied());
    keep.extend(survivors.trimmed.iter().map(|(id, _)| *id));
    keep.extend(closure(survivor_refs(graph, &survivors), graph));

    let remove: Vec<EntityId> = graph.ids().filter(|id| !keep.contains(id)).collect();
    let total = remove.len();
    debug!(total, "deleting entities outside keep-set");

    // Descending id order: later deletions never touch an already-deleted
    // relation.
    for (done, id) in remove.into_iter().rev().enumerate() {
        match graph.remove(id) {
            Ok(_) => report.removed += 1,
            Err(e) => {
                warn!(entity = %id, error = %e, "removal failed, skipping");
                report.failed += 1;
            }
        }
        emit_progress(progress, Phase::Rewrite, done + 1, total);
    }
}

/// Rebuild-from-empty strategy: deep-copy the keep-set into a fresh graph
/// with a remapped id space, rebuild surviving relations there, and
/// re-derive spatial containment for elements whose container was severed.
pub fn constructive(
    graph: &GraphModel,
    keep: &HashSet<EntityId>,
    patcher: &RelationPatcher,
    config: &FilterConfig,
    report: &mut FilterReport,
    progress: Option<&ProgressFn>,
) -> Result<GraphModel> {
    let survivors = evaluate_relations(graph, keep, patcher);
    report.relations_trimmed += survivors.trimmed.len();
    report.relations_dropped += survivors.dropped.len();

    let trimmed: HashMap<EntityId, Vec<AttrValue>> = survivors.trimmed.iter().cloned().collect();

    let mut final_keep = keep.clone();
    final_keep.extend(survivors.unchanged.iter().copied());
    final_keep.extend(trimmed.keys().copied());
    final_keep.extend(closure(survivor_refs(graph, &survivors), graph));

    // Pass one: allocate new ids in ascending old-id order so the output
    // is deterministic for a given input and keep-set.
    let mut ordered: Vec<EntityId> = final_keep.iter().copied().collect();
    ordered.sort();
    let id_map: HashMap<EntityId, EntityId> = ordered
        .iter()
        .enumerate()
        .map(|(i, &old)| (old, EntityId(i as u64 + 1)))
        .collect();

    // Pass two: copy with references rewritten into the new id space.
    let mut out = GraphModel::new();
    out.set_header(graph.header().to_vec());
    let total = ordered.len();

    for (done, &old_id) in ordered.iter().enumerate() {
        let Ok(entity) = graph.get(old_id) else {
            warn!(entity = %old_id, "keep-set id not in graph, skipping copy");
            report.failed += 1;
            continue;
        };
        let attrs = trimmed.get(&old_id).unwrap_or(&entity.attrs);

        let mut mapped = Vec::with_capacity(attrs.len());
        let mut complete = true;
        for attr in attrs {
            match attr.map_refs(&|r| id_map.get(&r).copied()) {
                Some(value) => mapped.push(value),
                None => {
                    complete = false;
                    break;
                }
            }
        }
        if !complete {
            warn!(entity = %old_id, "reference outside keep-set, skipping copy");
            report.failed += 1;
            continue;
        }

        out.insert(Entity::new(id_map[&old_id], entity.ty.clone(), mapped));
        emit_progress(progress, Phase::Rewrite, done + 1, total);
    }

    report.removed += graph.len().saturating_sub(out.len());

    rederive_containment(graph, &survivors, &trimmed, &id_map, config, &mut out, report);
    Ok(out)
}

/// Elements that were spatially contained in the source but lost their
/// containment relation get a synthesized one: walk the source
/// aggregation/containment parent chain up to a spatial-structure ancestor,
/// falling back to the first default container, one new relation per
/// (container, element batch) group.
fn rederive_containment(
    graph: &GraphModel,
    survivors: &Survivors,
    trimmed: &HashMap<EntityId, Vec<AttrValue>>,
    id_map: &HashMap<EntityId, EntityId>,
    config: &FilterConfig,
    out: &mut GraphModel,
    report: &mut FilterReport,
) {
    let containable = containment_members(graph);
    if containable.is_empty() {
        return;
    }

    let covered = covered_members(graph, survivors, trimmed);
    let mut orphans: Vec<EntityId> = containable
        .iter()
        .filter(|id| id_map.contains_key(id) && !covered.contains(id))
        .copied()
        .collect();
    orphans.sort();
    if orphans.is_empty() {
        return;
    }

    let parents = parent_map(graph);
    let spatial = config.spatial_set();
    let fallback = graph
        .first_of_type(&config.default_container_type)
        .filter(|id| id_map.contains_key(id));

    let mut groups: BTreeMap<EntityId, Vec<EntityId>> = BTreeMap::new();
    for orphan in orphans {
        let ancestor = spatial_ancestor(graph, &parents, orphan, &spatial)
            .filter(|id| id_map.contains_key(id))
            .or(fallback);
        match ancestor {
            Some(container) => groups.entry(container).or_default().push(orphan),
            None => {
                // No container anywhere in the model: emitted uncontained.
                report.uncontained += 1;
            }
        }
    }

    for (container, members) in groups {
        let element_refs = members
            .iter()
            .map(|m| AttrValue::Ref(id_map[m]))
            .collect();
        let relation = Entity::new(
            EntityId(0),
            CONTAINMENT,
            vec![
                AttrValue::Raw(format!("'{}'", Uuid::new_v4().simple())),
                AttrValue::Null,
                AttrValue::Null,
                AttrValue::Null,
                AttrValue::List(element_refs),
                AttrValue::Ref(id_map[&container]),
            ],
        );
        let id = out.add(relation);
        debug!(relation = %id, container = %container, "synthesized containment");
        report.relations_synthesized += 1;
    }
}

/// Every id listed as a contained element anywhere in the source graph.
fn containment_members(graph: &GraphModel) -> HashSet<EntityId> {
    let mut members = HashSet::new();
    for id in graph.entities_of_type(CONTAINMENT) {
        if let Ok(rel) = graph.get(id) {
            if let Some(items) = rel.list_at(4) {
                for item in items {
                    item.for_each_ref(&mut |r| {
                        members.insert(r);
                    });
                }
            }
        }
    }
    members
}

/// Ids still covered by a surviving containment relation.
fn covered_members(
    graph: &GraphModel,
    survivors: &Survivors,
    trimmed: &HashMap<EntityId, Vec<AttrValue>>,
) -> HashSet<EntityId> {
    let mut covered = HashSet::new();
    for &id in &survivors.unchanged {
        if let Ok(rel) = graph.get(id) {
            if rel.ty == CONTAINMENT {
                if let Some(items) = rel.list_at(4) {
                    for item in items {
                        item.for_each_ref(&mut |r| {
                            covered.insert(r);
                        });
                    }
                }
            }
        }
    }
    for (id, attrs) in trimmed {
        let Ok(rel) = graph.get(*id) else { continue };
        if rel.ty != CONTAINMENT {
            continue;
        }
        if let Some(AttrValue::List(items)) = attrs.get(4) {
            for item in items {
                item.for_each_ref(&mut |r| {
                    covered.insert(r);
                });
            }
        }
    }
    covered
}

/// Child-to-parent map from the source graph's aggregation, nesting and
/// containment relations, built once before filtering.
fn parent_map(graph: &GraphModel) -> HashMap<EntityId, EntityId> {
    let mut parents = HashMap::new();

    let mut record = |parent: Option<EntityId>, items: Option<&[AttrValue]>| {
        let (Some(parent), Some(items)) = (parent, items) else {
            return;
        };
        for item in items {
            item.for_each_ref(&mut |child| {
                parents.entry(child).or_insert(parent);
            });
        }
    };

    for ty in ["IFCRELAGGREGATES", "IFCRELNESTS"] {
        for id in graph.entities_of_type(ty) {
            if let Ok(rel) = graph.get(id) {
                record(rel.reference_at(4), rel.list_at(5));
            }
        }
    }
    for id in graph.entities_of_type(CONTAINMENT) {
        if let Ok(rel) = graph.get(id) {
            record(rel.reference_at(5), rel.list_at(4));
        }
    }

    parents
}

/// Iterative parent-chain walk with a visited set; pathological aggregation
/// cycles terminate instead of recursing.
fn spatial_ancestor(
    graph: &GraphModel,
    parents: &HashMap<EntityId, EntityId>,
    start: EntityId,
    spatial: &BTreeSet<String>,
) -> Option<EntityId> {
    let mut visited = HashSet::new();
    let mut current = start;
    while visited.insert(current) {
        let parent = *parents.get(&current)?;
        if graph.get(parent).is_ok_and(|e| spatial.contains(&e.ty)) {
            return Some(parent);
        }
        current = parent;
    }
    None
}
