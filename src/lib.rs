//! # ifcprune
//!
//! Prune large IFC/STEP building models down to selected element types.
//!
//! Given a loaded entity graph, ifcprune keeps the entities of the types
//! you ask for plus the structural skeleton (project, site, building,
//! storeys, spaces), expands that selection into a transitively closed
//! keep-set, repairs or drops every relation entity so nothing dangles,
//! and produces a reduced graph with full referential integrity.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::path::Path;
//! use ifcprune::{step, FilterOptions, Strategy};
//!
//! let graph = step::load(Path::new("model.ifc")).unwrap();
//! let options = FilterOptions::new(vec!["IfcWall".into()], Strategy::Subtractive);
//! let (pruned, report) = ifcprune::filter::run(graph, &options).unwrap();
//! step::write(&pruned, Path::new("walls.ifc")).unwrap();
//! println!("kept {} of {} entities", report.kept, report.kept + report.removed);
//! ```
//!
//! Two rewrite strategies are available: `Subtractive` deletes in place on
//! the loaded graph, `Constructive` rebuilds from empty and additionally
//! re-derives spatial containment for elements whose container was severed.

pub mod config;
pub mod error;
pub mod filter;
pub mod model;
pub mod step;

// Re-exports for convenience
pub use config::FilterConfig;
pub use error::{PruneError, Result};
pub use filter::{FilterOptions, FilterReport, Progress, Strategy};
pub use model::{AttrValue, Entity, EntityId, GraphModel};
