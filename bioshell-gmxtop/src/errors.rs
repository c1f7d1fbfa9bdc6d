use thiserror::Error;

/// Errors that may appear while reading a GROMACS topology file.
///
/// Only *fatal* conditions are represented here. Capacity overruns and
/// malformed records are recoverable; they are logged as warnings by the
/// parser and otherwise ignored, per the topology format's permissive
/// disposition towards vendor-specific trailing data.
#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("I/O error while reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{file}:{line}: #else without a matching #ifdef/#ifndef")]
    UnmatchedElse { file: String, line: usize },

    #[error("{file}:{line}: #endif without a matching #ifdef/#ifndef")]
    UnmatchedEndif { file: String, line: usize },

    #[error("{file}:{line}: conditional nesting exceeds the maximum depth of {max}")]
    ConditionalNestingTooDeep { file: String, line: usize, max: usize },

    #[error("{file}:{line}: #include nesting exceeds the maximum depth of {max}")]
    IncludeNestingTooDeep { file: String, line: usize, max: usize },

    #[error("molecule type '{name}' referenced in [ molecules ] was never defined")]
    UnresolvedMoleculeType { name: String },
}
