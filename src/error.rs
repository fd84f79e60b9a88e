//! Error types for message protection operations.

use thiserror::Error;

/// Result type alias for message protection operations.
pub type Result<T> = std::result::Result<T, PqMailError>;

/// Main error type for message protection operations.
#[derive(Error, Debug)]
pub enum PqMailError {
    /// Entry-point misuse (building twice, resuming without a pending build)
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Requested crypto mode conflicts with the message being built
    #[error("Policy violation: {0}")]
    Policy(String),

    /// The external OpenPGP provider failed or answered out of protocol
    #[error("Provider error: {0}")]
    Provider(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Broken internal invariants
    #[error("Assertion failure: {0}")]
    Assertion(String),

    /// MIME construction or serialization errors
    #[error("MIME error: {0}")]
    Mime(String),

    /// Armor encoding/decoding errors
    #[error("Armor error: {0}")]
    Armor(String),

    /// Post-quantum signature errors
    #[error("Signature error: {0}")]
    Signature(String),
}

impl PqMailError {
    /// Creates a new invalid state error.
    pub fn invalid_state<T: ToString>(msg: T) -> Self {
        Self::InvalidState(msg.to_string())
    }

    /// Creates a new policy violation error.
    pub fn policy<T: ToString>(msg: T) -> Self {
        Self::Policy(msg.to_string())
    }

    /// Creates a new provider error.
    pub fn provider<T: ToString>(msg: T) -> Self {
        Self::Provider(msg.to_string())
    }

    /// Creates a new assertion failure error.
    pub fn assertion<T: ToString>(msg: T) -> Self {
        Self::Assertion(msg.to_string())
    }

    /// Creates a new MIME error.
    pub fn mime<T: ToString>(msg: T) -> Self {
        Self::Mime(msg.to_string())
    }

    /// Creates a new armor error.
    pub fn armor<T: ToString>(msg: T) -> Self {
        Self::Armor(msg.to_string())
    }

    /// Creates a new signature error.
    pub fn signature<T: ToString>(msg: T) -> Self {
        Self::Signature(msg.to_string())
    }
}
