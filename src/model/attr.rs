//
//  attr.rs
//  ifcprune
//

use crate::model::EntityId;

/// One attribute slot value of an entity.
///
/// Scalars are kept verbatim as their STEP source text (`Raw`), so the core
/// never needs to understand measures, enums or typed parameters; it only
/// distinguishes values that carry references from values that don't.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// `$`, unset.
    Null,
    /// `*`, derived.
    Derived,
    /// Any scalar token, kept as source text (`'a wall'`, `42`, `.ELEMENT.`,
    /// `IFCBOOLEAN(.T.)`).
    Raw(String),
    /// `#N`, reference to another entity.
    Ref(EntityId),
    /// `(...)`, ordered aggregate; may nest.
    List(Vec<AttrValue>),
}

impl AttrValue {
    /// Visit every reference in this value, walking nested lists with an
    /// explicit stack.
    pub fn for_each_ref(&self, f: &mut impl FnMut(EntityId)) {
        let mut stack = vec![self];
        while let Some(value) = stack.pop() {
            match value {
                AttrValue::Ref(id) => f(*id),
                AttrValue::List(items) => stack.extend(items.iter()),
                _ => {}
            }
        }
    }

    /// Rewrite every reference through `map`. Returns `None` if any
    /// reference has no mapping, leaving the caller to decide what a
    /// dangling reference means.
    pub fn map_refs(&self, map: &impl Fn(EntityId) -> Option<EntityId>) -> Option<AttrValue> {
        match self {
            AttrValue::Ref(id) => map(*id).map(AttrValue::Ref),
            AttrValue::List(items) => {
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    mapped.push(item.map_refs(map)?);
                }
                Some(AttrValue::List(mapped))
            }
            other => Some(other.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_each_ref_walks_nested_lists() {
        let value = AttrValue::List(vec![
            AttrValue::Ref(EntityId(1)),
            AttrValue::List(vec![AttrValue::Ref(EntityId(2)), AttrValue::Null]),
            AttrValue::Raw("'label'".to_string()),
        ]);

        let mut seen = Vec::new();
        value.for_each_ref(&mut |id| seen.push(id));
        seen.sort();
        assert_eq!(seen, vec![EntityId(1), EntityId(2)]);
    }

    #[test]
    fn test_map_refs_fails_on_unmapped() {
        let value = AttrValue::List(vec![AttrValue::Ref(EntityId(1)), AttrValue::Ref(EntityId(2))]);
        let map = |id: EntityId| (id == EntityId(1)).then_some(EntityId(10));
        assert!(value.map_refs(&map).is_none());
    }

    #[test]
    fn test_map_refs_rewrites() {
        let value = AttrValue::List(vec![AttrValue::Ref(EntityId(1)), AttrValue::Derived]);
        let mapped = value.map_refs(&|id| Some(EntityId(id.0 + 100))).unwrap();
        assert_eq!(
            mapped,
            AttrValue::List(vec![AttrValue::Ref(EntityId(101)), AttrValue::Derived])
        );
    }
}
