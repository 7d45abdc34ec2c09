use finrich_core::{ConfigError, PipelineError, TableError, ValidationError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("command error: {0}")]
    Command(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("identifier source '{source_name}' produced no identifiers: {reason}")]
    NoIdentifiers { source_name: String, reason: String },

    #[error(transparent)]
    Table(#[from] TableError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Command(_) => 2,
            Self::Config(_) => 3,
            Self::NoIdentifiers { .. } => 4,
            Self::Table(_) => 10,
            Self::Io(_) => 10,
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::NoIdentifiers {
                source_name,
                reason,
            } => Self::NoIdentifiers {
                source_name,
                reason,
            },
            PipelineError::Config(error) => Self::Config(error),
            PipelineError::Table(error) => Self::Table(error),
            PipelineError::Validation(error) => Self::Validation(error),
        }
    }
}
