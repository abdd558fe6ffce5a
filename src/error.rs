//! Error types for ifcprune.

use std::path::PathBuf;
use thiserror::Error;

use crate::model::EntityId;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, PruneError>;

/// Fatal errors. Non-fatal conditions (unmatched keep-types, skipped
/// removals) are reported through `FilterReport`, not through this enum.
#[derive(Error, Debug)]
pub enum PruneError {
    /// An entity id was looked up but is not present in the graph.
    #[error("entity {0} not found in graph")]
    NotFound(EntityId),

    /// The input file could not be parsed as a STEP physical file.
    #[error("parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The file is structurally not a STEP file (missing sections, no data).
    #[error("invalid STEP file: {0}")]
    InvalidFile(String),

    /// The input path does not exist.
    #[error("file not found: {0}")]
    FileNotFound(PathBuf),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl PruneError {
    /// Shorthand used by the STEP reader.
    pub(crate) fn parse(line: usize, message: impl Into<String>) -> Self {
        PruneError::Parse {
            line,
            message: message.into(),
        }
    }
}
