//
//  relations.rs
//  ifcprune
//

use std::collections::{HashMap, HashSet};
use tracing::debug;

use crate::filter::closure::closure;
use crate::model::{AttrValue, Entity, EntityId, GraphModel};

/// Declarative shape of one relation category.
///
/// Slot numbers are zero-based attribute positions in the IFC4 schema.
/// Anchors are single references that must stay kept for the relation to
/// survive; lists are reference aggregates filtered against the keep-set.
#[derive(Debug, Clone, Copy)]
pub enum RelationRule {
    /// All anchors must be kept; every list slot is filtered and the
    /// relation is dropped if any list empties.
    Anchored {
        anchors: &'static [usize],
        lists: &'static [usize],
    },
    /// No anchors; list filtering only.
    Filtered { lists: &'static [usize] },
    /// Voids pattern: if the anchor is kept, the related entity and the
    /// relation itself are pulled into the keep-set. A closure extension,
    /// not a filter: openings are only discoverable through this relation.
    Propagate { anchor: usize, related: usize },
}

/// Outcome of patching one relation against the keep-set.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
    /// Survives unchanged.
    Keep,
    /// Survives with rewritten attribute slots (lists trimmed).
    Trim(Vec<AttrValue>),
    /// Anchors lost, a list emptied, or a dangling reference: dropped.
    Drop,
}

const RULES: &[(&str, RelationRule)] = &[
    (
        "IFCRELCONTAINEDINSPATIALSTRUCTURE",
        RelationRule::Anchored {
            anchors: &[5],
            lists: &[4],
        },
    ),
    (
        "IFCRELAGGREGATES",
        RelationRule::Anchored {
            anchors: &[4],
            lists: &[5],
        },
    ),
    (
        "IFCRELNESTS",
        RelationRule::Anchored {
            anchors: &[4],
            lists: &[5],
        },
    ),
    (
        "IFCRELDEFINESBYPROPERTIES",
        RelationRule::Filtered { lists: &[4] },
    ),
    (
        "IFCRELDEFINESBYTYPE",
        RelationRule::Filtered { lists: &[4] },
    ),
    (
        "IFCRELASSOCIATESMATERIAL",
        RelationRule::Filtered { lists: &[4] },
    ),
    (
        "IFCPRESENTATIONLAYERASSIGNMENT",
        RelationRule::Filtered { lists: &[2] },
    ),
    (
        "IFCRELVOIDSELEMENT",
        RelationRule::Propagate {
            anchor: 4,
            related: 5,
        },
    ),
    (
        "IFCRELCONNECTSPATHELEMENTS",
        RelationRule::Anchored {
            anchors: &[5, 6],
            lists: &[],
        },
    ),
];

/// Table-driven relation repair.
pub struct RelationPatcher {
    rules: HashMap<&'static str, RelationRule>,
}

impl RelationPatcher {
    pub fn new() -> Self {
        Self {
            rules: RULES.iter().copied().collect(),
        }
    }

    /// Whether this type is a relation entity whose survival is decided by
    /// patching rather than by closure membership.
    pub fn is_relation(&self, ty: &str) -> bool {
        self.rules.contains_key(ty) || ty.starts_with("IFCREL")
    }

    /// Apply all `Propagate` rules: relations whose anchor is kept pull
    /// their related entity and themselves into the keep-set, closure
    /// expanded (openings drag their geometry along). Returns the number of
    /// newly kept entities.
    pub fn propagate(&self, graph: &GraphModel, keep: &mut HashSet<EntityId>) -> usize {
        let mut seeds = Vec::new();

        for (ty, rule) in &self.rules {
            let RelationRule::Propagate { anchor, related } = rule else {
                continue;
            };
            for id in graph.entities_of_type(ty) {
                let Ok(entity) = graph.get(id) else { continue };
                let anchored = entity
                    .reference_at(*anchor)
                    .is_some_and(|a| keep.contains(&a));
                if anchored {
                    seeds.push(id);
                    if let Some(target) = entity.reference_at(*related) {
                        seeds.push(target);
                    }
                }
            }
        }

        let expanded = closure(seeds, graph);
        let before = keep.len();
        keep.extend(expanded);
        let added = keep.len() - before;
        if added > 0 {
            debug!(added, "voids propagation extended keep-set");
        }
        added
    }

    /// Decide the fate of one relation entity against the final keep-set.
    ///
    /// Types not in the table but relation-like (IFCREL*) are treated
    /// conservatively: kept only if every reference they hold is kept,
    /// dropped otherwise, never emitted dangling.
    pub fn patch(&self, entity: &Entity, keep: &HashSet<EntityId>) -> Patch {
        match self.rules.get(entity.ty.as_str()) {
            Some(RelationRule::Anchored { anchors, lists }) => {
                for &slot in *anchors {
                    let anchored = entity
                        .reference_at(slot)
                        .is_some_and(|a| keep.contains(&a));
                    if !anchored {
                        return Patch::Drop;
                    }
                }
                Self::filter_lists(entity, lists, keep)
            }
            Some(RelationRule::Filtered { lists }) => Self::filter_lists(entity, lists, keep),
            Some(RelationRule::Propagate { anchor, related }) => {
                // Normally resolved by propagate() ahead of patching; seen
                // here only when the anchor was not kept.
                let survives = entity
                    .reference_at(*anchor)
                    .is_some_and(|a| keep.contains(&a))
                    && entity
                        .reference_at(*related)
                        .is_some_and(|r| keep.contains(&r));
                if survives {
                    Patch::Keep
                } else {
                    Patch::Drop
                }
            }
            None => {
                let mut dangling = false;
                entity.for_each_ref(&mut |id| {
                    if !keep.contains(&id) {
                        dangling = true;
                    }
                });
                if dangling {
                    Patch::Drop
                } else {
                    Patch::Keep
                }
            }
        }
    }

    fn filter_lists(entity: &Entity, lists: &[usize], keep: &HashSet<EntityId>) -> Patch {
        let mut attrs = entity.attrs.clone();
        let mut changed = false;

        for &slot in lists {
            let Some(AttrValue::List(items)) = attrs.get(slot) else {
                // A declared list slot that is not a list is malformed;
                // dropping is the only safe repair.
                return Patch::Drop;
            };
            let filtered: Vec<AttrValue> = items
                .iter()
                .filter(|item| match item {
                    AttrValue::Ref(id) => keep.contains(id),
                    _ => true,
                })
                .cloned()
                .collect();

            if filtered.is_empty() {
                return Patch::Drop;
            }
            if filtered.len() != items.len() {
                changed = true;
                attrs[slot] = AttrValue::List(filtered);
            }
        }

        if changed {
            Patch::Trim(attrs)
        } else {
            Patch::Keep
        }
    }
}

impl Default for RelationPatcher {
    fn default() -> Self {
        Self::new()
    }
}
