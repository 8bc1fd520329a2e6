//! Error types for the identity seam.

/// Errors produced while resolving a caller's identity.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The token was unknown, revoked, or malformed.
    #[error("authentication failed: {0}")]
    AuthFailed(String),
}
