use thiserror::Error;

/// Result alias used throughout the faceting engine
pub type Result<T> = std::result::Result<T, TrellisError>;

/// Errors that can occur while grouping, measuring or ordering facets
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TrellisError {
    #[error("Record has no field named '{field}'")]
    MissingField { field: String },

    #[error("Accessor failed: {0}")]
    Accessor(String),

    #[error("Unknown sort type '{0}'")]
    UnknownSortType(String),
}

impl TrellisError {
    /// Build an accessor failure from any displayable cause
    pub fn accessor(cause: impl std::fmt::Display) -> Self {
        TrellisError::Accessor(cause.to_string())
    }
}
