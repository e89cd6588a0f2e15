use thiserror::Error;

/// Outcome of a failed authentication, as seen by the caller.
///
/// Granular reasons are logged where they happen and collapse into one of these two buckets.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    /// No credential, a bad credential, or no user behind it.
    #[error("{0}")]
    Unauthenticated(String),

    /// Valid identity without the required role.
    #[error("{0}")]
    Unauthorized(String),
}

impl AuthError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        AuthError::Unauthenticated(message.into())
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        AuthError::Unauthorized(message.into())
    }
}
