//
//  graph.rs
//  ifcprune
//

use std::collections::{BTreeMap, HashMap};

use crate::error::{PruneError, Result};
use crate::model::{Entity, EntityId};

/// In-memory store of all entities, indexed by id and by type.
///
/// The type index records insertion order per type for deterministic
/// enumeration. Removal does not eagerly scrub the index; enumeration
/// filters ids against the live entity map instead, so single-entity
/// removal stays O(log n) even when an entire type is being deleted.
#[derive(Debug, Clone)]
pub struct GraphModel {
    entities: BTreeMap<EntityId, Entity>,
    type_index: HashMap<String, Vec<EntityId>>,
    /// Verbatim header records from the source file, re-emitted on write.
    header: Vec<String>,
    next_id: u64,
}

impl GraphModel {
    pub fn new() -> Self {
        Self {
            entities: BTreeMap::new(),
            type_index: HashMap::new(),
            header: Vec::new(),
            next_id: 1,
        }
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn get(&self, id: EntityId) -> Result<&Entity> {
        self.entities.get(&id).ok_or(PruneError::NotFound(id))
    }

    pub fn get_mut(&mut self, id: EntityId) -> Result<&mut Entity> {
        self.entities.get_mut(&id).ok_or(PruneError::NotFound(id))
    }

    /// Insert an entity, preserving its id (load path and rebuild path).
    /// Replaces any existing entity with the same id.
    pub fn insert(&mut self, entity: Entity) {
        let id = entity.id;
        let ty = entity.ty.clone();
        let previous = self.entities.insert(id, entity);
        // Replacing under the same type must not duplicate the index entry.
        if previous.map_or(true, |old| old.ty != ty) {
            self.type_index.entry(ty).or_default().push(id);
        }
        self.next_id = self.next_id.max(id.0 + 1);
    }

    /// Insert an entity under a freshly assigned id (constructive path).
    pub fn add(&mut self, mut entity: Entity) -> EntityId {
        let id = EntityId(self.next_id);
        entity.id = id;
        self.insert(entity);
        id
    }

    /// Remove a single entity. No cascade: the caller must first ensure no
    /// surviving relation still references it.
    pub fn remove(&mut self, id: EntityId) -> Result<Entity> {
        self.entities.remove(&id).ok_or(PruneError::NotFound(id))
    }

    /// Ids of all live entities with exactly this type tag, in insertion
    /// order. Unknown types yield an empty vector.
    pub fn entities_of_type(&self, ty: &str) -> Vec<EntityId> {
        let ty = ty.to_ascii_uppercase();
        match self.type_index.get(&ty) {
            Some(ids) => ids
                .iter()
                .copied()
                .filter(|id| self.entities.get(id).is_some_and(|e| e.ty == ty))
                .collect(),
            None => Vec::new(),
        }
    }

    /// First live entity of a type, if any.
    pub fn first_of_type(&self, ty: &str) -> Option<EntityId> {
        self.entities_of_type(ty).into_iter().next()
    }

    /// All type tags with at least one live entity.
    pub fn types_present(&self) -> Vec<String> {
        let mut types: Vec<String> = self
            .type_index
            .keys()
            .filter(|ty| !self.entities_of_type(ty).is_empty())
            .cloned()
            .collect();
        types.sort();
        types
    }

    /// All live ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    /// All live entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Live entity count per type, for auditing and equivalence checks.
    pub fn count_by_type(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for entity in self.entities.values() {
            *counts.entry(entity.ty.clone()).or_insert(0) += 1;
        }
        counts
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn set_header(&mut self, header: Vec<String>) {
        self.header = header;
    }

    pub fn push_header_record(&mut self, record: String) {
        self.header.push(record);
    }
}

impl Default for GraphModel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::AttrValue;

    fn wall(id: u64) -> Entity {
        Entity::new(EntityId(id), "IFCWALL", vec![AttrValue::Null])
    }

    #[test]
    fn test_empty_graph() {
        let graph = GraphModel::new();
        assert!(graph.is_empty());
        assert!(graph.entities_of_type("IFCWALL").is_empty());
        assert!(graph.get(EntityId(1)).is_err());
    }

    #[test]
    fn test_insert_preserves_id_and_order() {
        let mut graph = GraphModel::new();
        graph.insert(wall(10));
        graph.insert(wall(3));
        graph.insert(wall(7));

        // Type enumeration follows insertion order, not id order.
        assert_eq!(
            graph.entities_of_type("IfcWall"),
            vec![EntityId(10), EntityId(3), EntityId(7)]
        );
        // Id iteration is ascending.
        let ids: Vec<EntityId> = graph.ids().collect();
        assert_eq!(ids, vec![EntityId(3), EntityId(7), EntityId(10)]);
    }

    #[test]
    fn test_add_assigns_fresh_ids() {
        let mut graph = GraphModel::new();
        graph.insert(wall(5));
        let id = graph.add(Entity::new(EntityId(0), "IFCDOOR", vec![]));
        assert_eq!(id, EntityId(6));
        assert_eq!(graph.get(id).unwrap().ty, "IFCDOOR");
    }

    #[test]
    fn test_remove_updates_enumeration() {
        let mut graph = GraphModel::new();
        graph.insert(wall(1));
        graph.insert(wall(2));

        graph.remove(EntityId(1)).unwrap();
        assert_eq!(graph.entities_of_type("IFCWALL"), vec![EntityId(2)]);
        assert!(graph.remove(EntityId(1)).is_err(), "double remove fails");
    }

    #[test]
    fn test_reinsert_with_different_type() {
        let mut graph = GraphModel::new();
        graph.insert(wall(1));
        graph.remove(EntityId(1)).unwrap();
        graph.insert(Entity::new(EntityId(1), "IFCDOOR", vec![]));

        // The stale wall index entry must not resurface id 1.
        assert!(graph.entities_of_type("IFCWALL").is_empty());
        assert_eq!(graph.entities_of_type("IFCDOOR"), vec![EntityId(1)]);
    }

    #[test]
    fn test_replace_same_id_keeps_single_index_entry() {
        let mut graph = GraphModel::new();
        graph.insert(wall(1));
        graph.insert(wall(1));

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.entities_of_type("IFCWALL"), vec![EntityId(1)]);
    }

    #[test]
    fn test_types_present_skips_emptied_types() {
        let mut graph = GraphModel::new();
        graph.insert(wall(1));
        graph.insert(Entity::new(EntityId(2), "IFCDOOR", vec![]));
        graph.remove(EntityId(2)).unwrap();

        assert_eq!(graph.types_present(), vec!["IFCWALL".to_string()]);
    }

    #[test]
    fn test_count_by_type() {
        let mut graph = GraphModel::new();
        graph.insert(wall(1));
        graph.insert(wall(2));
        graph.insert(Entity::new(EntityId(3), "IFCDOOR", vec![]));

        let counts = graph.count_by_type();
        assert_eq!(counts["IFCWALL"], 2);
        assert_eq!(counts["IFCDOOR"], 1);
    }
}
