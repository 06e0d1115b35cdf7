use thiserror::Error;
use tickersense_core::{ConfigError, HttpError, PipelineError, RenderError, ValidationError};

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid symbol '{symbol}': {reason}")]
    InvalidSymbol { symbol: String, reason: String },

    #[error("price acquisition failed for '{symbol}': {reason}")]
    Acquisition { symbol: String, reason: String },

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("http client setup failed: {0}")]
    Transport(#[from] HttpError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) | Self::Config(_) => 2,
            Self::InvalidSymbol { .. } => 3,
            Self::Acquisition { .. } => 4,
            Self::Render(_) => 5,
            Self::Serialization(_) => 6,
            Self::Io(_) | Self::Transport(_) => 10,
        }
    }
}

impl From<PipelineError> for CliError {
    fn from(error: PipelineError) -> Self {
        match error {
            PipelineError::Validation(error) => Self::Validation(error),
            PipelineError::InvalidSymbol { symbol, reason } => Self::InvalidSymbol { symbol, reason },
            PipelineError::AcquisitionFailure { symbol, reason } => Self::Acquisition { symbol, reason },
            PipelineError::Render(error) => Self::Render(error),
        }
    }
}
