//! Graph filtering pipeline.
//!
//! Sequencing: TypeSelector resolves the keep/remove type partition,
//! ClosureComputer expands it into a transitively closed keep-set of ids,
//! RelationPatcher extends the set (voids propagation) and decides relation
//! fates, and one of the two rewriters produces the output graph. Each
//! stage is a pure function of its inputs; the keep-set is threaded
//! explicitly rather than shared.

pub mod closure;
pub mod relations;
pub mod rewrite;
pub mod select;

use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::config::FilterConfig;
use crate::error::Result;
use crate::model::{EntityId, GraphModel};
use relations::RelationPatcher;

/// Which rewrite strategy to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Delete-in-place on the loaded graph.
    Subtractive,
    /// Rebuild-from-empty with id remapping and containment re-derivation.
    Constructive,
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "subtractive" => Ok(Strategy::Subtractive),
            "constructive" => Ok(Strategy::Constructive),
            other => Err(format!("unknown strategy '{other}'")),
        }
    }
}

/// Pipeline phase, for progress observation only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Closure expansion and voids propagation.
    Expand,
    /// Relation patching.
    Patch,
    /// Deletion or copying.
    Rewrite,
}

/// Observational progress sample. Carries no correctness obligation; the
/// callback must not block.
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub phase: Phase,
    pub done: usize,
    pub total: usize,
}

pub type ProgressFn = Box<dyn Fn(&Progress)>;

/// One filter run's parameters.
pub struct FilterOptions {
    /// Requested keep-type names, free-form (normalized to uppercase).
    pub types: Vec<String>,
    pub strategy: Strategy,
    pub config: FilterConfig,
    /// Invoked periodically during the rewrite phase.
    pub progress: Option<ProgressFn>,
}

impl FilterOptions {
    pub fn new(types: Vec<String>, strategy: Strategy) -> Self {
        Self {
            types,
            strategy,
            config: FilterConfig::default(),
            progress: None,
        }
    }
}

/// Audit counts for one run. Always reported, success or partial.
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterReport {
    /// Entities in the output graph.
    pub kept: usize,
    /// Entities removed (subtractive) or not carried over (constructive).
    pub removed: usize,
    /// Entities whose individual removal or copy failed; skipped, non-fatal.
    pub failed: usize,
    pub relations_trimmed: usize,
    pub relations_dropped: usize,
    pub relations_synthesized: usize,
    /// Elements emitted without a spatial container (constructive only).
    pub uncontained: usize,
    /// Requested types that matched zero entities.
    pub unmatched_types: Vec<String>,
    pub elapsed_ms: u64,
}

/// Run the full pipeline over a loaded graph.
pub fn run(mut graph: GraphModel, options: &FilterOptions) -> Result<(GraphModel, FilterReport)> {
    let start = Instant::now();
    let mut report = FilterReport::default();
    let source_len = graph.len();

    let partition = select::resolve(&options.types, &options.config, &graph);
    for name in &partition.unmatched {
        warn!(ty = %name, "requested type matches no entities");
    }
    report.unmatched_types = partition.unmatched.clone();

    let progress = options.progress.as_ref();
    let observe = |phase: Phase, done: usize| {
        if let Some(callback) = progress {
            callback(&Progress {
                phase,
                done,
                total: source_len,
            });
        }
    };

    let seeds: Vec<EntityId> = partition
        .keep
        .iter()
        .flat_map(|ty| graph.entities_of_type(ty))
        .collect();
    let mut keep: HashSet<EntityId> = closure::closure(seeds, &graph);
    debug!(
        seeds = keep.len(),
        keep_types = partition.keep.len(),
        remove_types = partition.remove.len(),
        "keep-set closure computed"
    );
    observe(Phase::Expand, keep.len());

    let patcher = RelationPatcher::new();
    patcher.propagate(&graph, &mut keep);
    observe(Phase::Patch, keep.len());
    let output = match options.strategy {
        Strategy::Subtractive => {
            rewrite::subtractive(&mut graph, keep, &patcher, &mut report, progress);
            graph
        }
        Strategy::Constructive => {
            rewrite::constructive(&graph, &keep, &patcher, &options.config, &mut report, progress)?
        }
    };

    report.kept = output.len();
    report.elapsed_ms = start.elapsed().as_millis() as u64;
    info!(
        source = source_len,
        kept = report.kept,
        removed = report.removed,
        failed = report.failed,
        elapsed_ms = report.elapsed_ms,
        "filter run complete"
    );

    Ok((output, report))
}
