use thiserror::Error;

/// Convenience type alias for Results with CoreError
pub type Result<T> = std::result::Result<T, CoreError>;

/// Main error type for the coordination core
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("illegal transition on {entity}: {message}")]
    IllegalTransition { entity: String, message: String },

    #[error("event bus buffer full")]
    BufferOverflow,

    #[error("provider failure: {0}")]
    ProviderFailure(String),

    #[error("timeout: {message}")]
    Timeout { message: String },

    #[error("maximum waves reached")]
    MaxWavesReached,

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("agent error: {message}")]
    Agent { message: String },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}
