// MODEL ERROR
// ================================================================================================

/// Referential-integrity errors raised while validating a model.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("clock '{0}' is declared more than once")]
    DuplicateClock(String),
    #[error("location '{0}' is declared more than once")]
    DuplicateLocation(String),
    #[error("reset refers to unknown clock '{0}'")]
    UnknownClock(String),
    #[error("reference to unknown location '{0}'")]
    UnknownLocation(String),
    #[error("constraint name '{0}' is neither a clock nor a declared variable")]
    UnknownConstraintName(String),
}
