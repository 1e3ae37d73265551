use thiserror::Error;

// ---------------------------------------------------------------------------
// Library error type
// ---------------------------------------------------------------------------

/// Errors raised by the estimator, the data model and configuration.
///
/// Application boundaries (file loading, export, the viewer) wrap these in
/// `anyhow::Error` with context.
#[derive(Debug, Error)]
pub enum SierraError {
    /// A caller passed a value outside the domain of an operation
    /// (confidence level outside (0,1), negative scale under a strict policy…).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A mapped column is absent from the input table.
    #[error("missing column '{column}' (available: {available})")]
    MissingColumn { column: String, available: String },

    /// A cell in a mapped column could not be read as a number.
    #[error("column '{column}', row {row}: '{value}' is not a number")]
    InvalidValue {
        column: String,
        row: usize,
        value: String,
    },

    /// The observation series violates its ordering invariants.
    #[error("invalid series: {0}")]
    Series(String),

    /// The plot configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, SierraError>;
