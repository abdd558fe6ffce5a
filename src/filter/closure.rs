//
//  closure.rs
//  ifcprune
//

use std::collections::HashSet;

use crate::model::{EntityId, GraphModel};

/// Transitive closure of `seeds` over every reference-valued attribute.
///
/// Work-list traversal with an explicit visited set: cycle-safe and linear
/// in entities plus references, with no recursion. Seeds that do not
/// resolve in the graph contribute nothing. Idempotent:
/// `closure(closure(s)) == closure(s)`.
pub fn closure(
    seeds: impl IntoIterator<Item = EntityId>,
    graph: &GraphModel,
) -> HashSet<EntityId> {
    let mut visited: HashSet<EntityId> = HashSet::new();
    let mut work: Vec<EntityId> = seeds
        .into_iter()
        .filter(|id| graph.contains(*id))
        .collect();

    while let Some(id) = work.pop() {
        if !visited.insert(id) {
            continue;
        }
        if let Ok(entity) = graph.get(id) {
            entity.for_each_ref(&mut |target| {
                if !visited.contains(&target) && graph.contains(target) {
                    work.push(target);
                }
            });
        }
    }

    visited
}
