use thiserror::Error;

/// Validation and contract errors exposed by `finrich-core`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("identifier cannot be empty")]
    EmptyIdentifier,

    #[error("field name cannot be empty")]
    EmptyFieldName,
    #[error("field '{field}' is reserved for the record identifier")]
    ReservedField { field: String },

    #[error("batch size must be greater than zero")]
    ZeroBatchSize,
    #[error("max attempts must be greater than zero")]
    ZeroMaxAttempts,
    #[error("worker count must be greater than zero")]
    ZeroWorkers,

    #[error("invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { value: String },
    #[error("history window of {days} days reaches before the supported calendar range")]
    WindowOutOfRange { days: u32 },

    #[error("low-price threshold must be a positive finite number: '{value}'")]
    InvalidThreshold { value: String },
}

/// Missing or malformed runtime settings. Always fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required setting '{name}'; export it or add it to a .env file")]
    MissingSetting { name: &'static str },

    #[error("invalid value for setting '{name}': '{value}'")]
    InvalidSetting { name: &'static str, value: String },
}

/// Errors raised while reading or writing tabular files.
#[derive(Debug, Error)]
pub enum TableError {
    #[error(transparent)]
    Csv(#[from] csv::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("row {row}: {message}")]
    InvalidRow { row: usize, message: String },
}

/// Run-level failures. These terminate a pipeline run and are reported to the operator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("identifier source '{source_name}' produced no identifiers: {reason}")]
    NoIdentifiers { source_name: String, reason: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
