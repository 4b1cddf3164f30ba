use super::domain::{EmailAddress, User, UserId};

/// Storage abstraction for user records.
pub trait UserRepository: Send + Sync {
    fn insert_user(&self, user: User) -> Result<User, RepositoryError>;
    fn fetch_user(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;
    fn find_user_by_email(&self, email: &EmailAddress) -> Result<Option<User>, RepositoryError>;
    /// Replace the user's address and mark it verified. Fails with `Conflict`
    /// when another user already owns the address.
    fn update_email(&self, id: &UserId, email: &EmailAddress) -> Result<User, RepositoryError>;
    fn mark_email_verified(&self, id: &UserId) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
