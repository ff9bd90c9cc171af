pub mod error;
pub mod password;
pub mod rate_limiter;

pub use error::AuthError;
pub use password::{Argon2PasswordHasher, PasswordHasher};
pub use rate_limiter::InMemoryRateLimiter;
