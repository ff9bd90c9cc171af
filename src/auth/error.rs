use thiserror::Error;

/// Authentication and credential-handling errors.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("too many login attempts, try again later")]
    RateLimitExceeded,
    #[error("password hashing failed: {0}")]
    HashingFailed(String),
}
