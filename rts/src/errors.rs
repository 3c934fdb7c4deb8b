use tarzan_core::ModelError;

// RTS ERROR
// ================================================================================================

/// Errors surfaced by the kernel's construction and extraction boundaries.
///
/// Reachability itself never fails: empty successor or predecessor sets and exhausted frontiers
/// are ordinary results carried by the report.
#[derive(Debug, thiserror::Error)]
pub enum RtsError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("temporal formulae nested deeper than one level are not supported")]
    NestedFormula,
    #[error("unknown location '{0}'")]
    UnknownLocation(String),
    #[error("a network needs at least one automaton")]
    EmptyNetwork,
    #[error("symmetry group member {0} is not a component index")]
    SymmetryGroupOutOfRange(usize),
    #[error("symmetry groups must be pairwise disjoint (component {0} appears twice)")]
    OverlappingSymmetryGroups(usize),
}
