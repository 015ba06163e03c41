//! Error types for haggler

use crate::negotiation::types::SessionState;
use thiserror::Error;

/// Main error type for haggler
#[derive(Error, Debug)]
pub enum NegotiationError {
    // Caller input errors
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    // Session lifecycle errors
    #[error("Negotiation session not found: {0}")]
    SessionNotFound(String),

    #[error("Negotiation session {id} is closed ({state})")]
    SessionClosed { id: String, state: SessionState },

    #[error("Negotiation session already exists: {0}")]
    SessionAlreadyExists(String),

    #[error("Invalid negotiation state transition: {0}")]
    InvalidStateTransition(String),

    #[error("Market context already set for session {0}")]
    MarketContextAlreadySet(String),

    #[error("State corruption detected: {0}")]
    StateCorruption(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid configuration value: {0}")]
    InvalidConfig(String),

    // Collaborator errors
    #[error("Decision delivery failed: {0}")]
    Delivery(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl NegotiationError {
    /// Whether the error stems from caller misuse rather than bad input or a defect
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            NegotiationError::SessionNotFound(_)
                | NegotiationError::SessionClosed { .. }
                | NegotiationError::InvalidStateTransition(_)
                | NegotiationError::MarketContextAlreadySet(_)
        )
    }

    /// Whether an inbound quote was refused without harming the session
    ///
    /// Event loops log these and keep going; anything else stops them.
    pub fn is_rejected_quote(&self) -> bool {
        self.is_caller_misuse() || matches!(self, NegotiationError::InvalidParameters(_))
    }
}

/// Result type alias for haggler operations
pub type Result<T> = std::result::Result<T, NegotiationError>;
