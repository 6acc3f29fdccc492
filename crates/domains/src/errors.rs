//! # DomainError
//!
//! Centralized error handling for the Kindling workflow.
//! Every port returns this type so the services can tell reads from writes.

use thiserror::Error;

/// The primary error type for all domain and service operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// Reading candidates, profiles, decisions or matches failed.
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    /// Persisting a decision, profile or match failed.
    #[error("write failed: {0}")]
    WriteFailed(String),

    /// No current user identity.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Input rejected before reaching a store (empty name, inverted range).
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource already exists (e.g., email already registered)
    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid credentials")]
    InvalidCredentials,
}

impl DomainError {
    /// True for errors raised by a remote collaborator rather than by input.
    pub fn is_remote(&self) -> bool {
        matches!(self, DomainError::FetchFailed(_) | DomainError::WriteFailed(_))
    }
}

/// A specialized Result type for Kindling logic.
pub type Result<T> = std::result::Result<T, DomainError>;
