mod blueprint;

pub use blueprint::{BBox, Blueprint, Component, ComponentRef, DesignTokens, GeneratedFiles};

/// Identifier of one of the fixed page slots.
pub type PageId = String;

/// Common error types
#[derive(thiserror::Error, Debug)]
pub enum BlueprintError {
    #[error("unknown page: {0}")]
    UnknownPage(String),

    #[error("no blueprint loaded for page '{0}'")]
    NoActiveDocument(String),

    #[error("edit command is empty")]
    EmptyCommand,

    #[error("image payload is empty")]
    EmptyImage,

    /// Carries the service's human-readable reason unmodified.
    #[error("{0}")]
    UpstreamRejected(String),

    #[error("transport failure: {0}")]
    TransportFailure(String),

    #[error("page '{page}' changed while the request was in flight")]
    Superseded { page: String },

    #[error("nothing to undo on page '{0}'")]
    NothingToUndo(String),

    #[error("invalid blueprint: {0}")]
    InvalidBlueprint(String),

    #[error("invalid selection: {0}")]
    InvalidSelection(String),

    #[error("invalid viewport: {0}")]
    InvalidViewport(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Generic error: {0}")]
    Generic(#[from] anyhow::Error),
}

impl BlueprintError {
    /// Whether a caller may reasonably retry. The core itself never does.
    pub fn is_retryable(&self) -> bool {
        matches!(self, BlueprintError::TransportFailure(_))
    }
}

pub type Result<T> = std::result::Result<T, BlueprintError>;
