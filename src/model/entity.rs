//
//  entity.rs
//  ifcprune
//

use std::fmt;

use crate::model::AttrValue;

/// STEP instance name (`#N`). Stable within one loaded graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single typed record in the graph: id, open type tag, ordered slots.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub id: EntityId,
    /// Uppercase type tag. Open string, not a closed enum: schemas are
    /// extensible and unknown types must flow through untouched.
    pub ty: String,
    pub attrs: Vec<AttrValue>,
}

impl Entity {
    pub fn new(id: EntityId, ty: impl Into<String>, attrs: Vec<AttrValue>) -> Self {
        let mut ty = ty.into();
        ty.make_ascii_uppercase();
        Self { id, ty, attrs }
    }

    /// Exact, case-insensitive type check.
    pub fn is_a(&self, ty: &str) -> bool {
        self.ty.eq_ignore_ascii_case(ty)
    }

    /// Visit every reference held anywhere in this entity's slots.
    pub fn for_each_ref(&self, f: &mut impl FnMut(EntityId)) {
        for attr in &self.attrs {
            attr.for_each_ref(f);
        }
    }

    /// All references as a vector, in slot order (list order preserved).
    pub fn references(&self) -> Vec<EntityId> {
        let mut out = Vec::new();
        // for_each_ref pops a stack, which reverses list order; collect
        // per-slot items directly to keep source order.
        for attr in &self.attrs {
            collect_in_order(attr, &mut out);
        }
        out
    }

    /// The slot at `index`, if present.
    pub fn attr(&self, index: usize) -> Option<&AttrValue> {
        self.attrs.get(index)
    }

    /// The slot at `index` as a single reference, if it is one.
    pub fn reference_at(&self, index: usize) -> Option<EntityId> {
        match self.attrs.get(index) {
            Some(AttrValue::Ref(id)) => Some(*id),
            _ => None,
        }
    }

    /// The slot at `index` as a list, if it is one.
    pub fn list_at(&self, index: usize) -> Option<&[AttrValue]> {
        match self.attrs.get(index) {
            Some(AttrValue::List(items)) => Some(items),
            _ => None,
        }
    }
}

fn collect_in_order(value: &AttrValue, out: &mut Vec<EntityId>) {
    // Depth-first with an explicit work list; items are pushed in reverse
    // so pops come out in source order.
    let mut stack = vec![value];
    while let Some(v) = stack.pop() {
        match v {
            AttrValue::Ref(id) => out.push(*id),
            AttrValue::List(items) => {
                for item in items.iter().rev() {
                    stack.push(item);
                }
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_is_normalized() {
        let e = Entity::new(EntityId(1), "IfcWall", vec![]);
        assert_eq!(e.ty, "IFCWALL");
        assert!(e.is_a("ifcwall"));
        assert!(!e.is_a("IFCWALLSTANDARDCASE"));
    }

    #[test]
    fn test_references_preserve_order() {
        let e = Entity::new(
            EntityId(1),
            "IFCRELAGGREGATES",
            vec![
                AttrValue::Raw("'guid'".to_string()),
                AttrValue::Ref(EntityId(9)),
                AttrValue::List(vec![
                    AttrValue::Ref(EntityId(3)),
                    AttrValue::Ref(EntityId(2)),
                    AttrValue::Ref(EntityId(7)),
                ]),
            ],
        );
        assert_eq!(
            e.references(),
            vec![EntityId(9), EntityId(3), EntityId(2), EntityId(7)]
        );
    }

    #[test]
    fn test_slot_accessors() {
        let e = Entity::new(
            EntityId(1),
            "IFCWALL",
            vec![
                AttrValue::Null,
                AttrValue::Ref(EntityId(2)),
                AttrValue::List(vec![AttrValue::Ref(EntityId(3))]),
            ],
        );
        assert_eq!(e.reference_at(1), Some(EntityId(2)));
        assert_eq!(e.reference_at(0), None);
        assert_eq!(e.list_at(2).unwrap().len(), 1);
        assert!(e.attr(9).is_none());
    }
}
