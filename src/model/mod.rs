//! Entity graph data model.
//!
//! An IFC model is a flat store of typed entities whose attribute slots may
//! reference other entities by id. There are no implicit back-pointers:
//! every relationship is either a direct attribute reference or a
//! first-class relation entity.

pub mod attr;
pub mod entity;
pub mod graph;

pub use attr::AttrValue;
pub use entity::{Entity, EntityId};
pub use graph::GraphModel;
