//! Account registration.

use thiserror::Error;
use tracing::info;

use crate::auth::validation::{validate_username, ValidationError};
use crate::auth::{hash_password, PasswordError};
use crate::db::{NewUser, User, UserRepository};
use crate::Database;

/// Registration-specific errors.
#[derive(Error, Debug)]
pub enum RegistrationError {
    /// Validation failed.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Username already exists.
    #[error("this username is already taken")]
    UsernameExists,

    /// Password rejected or hashing failed.
    #[error("password error: {0}")]
    Password(#[from] PasswordError),

    /// Database error.
    #[error("database error: {0}")]
    Database(String),
}

impl From<crate::HuddleError> for RegistrationError {
    fn from(e: crate::HuddleError) -> Self {
        RegistrationError::Database(e.to_string())
    }
}

/// Register a new account.
///
/// Validates the username and password, hashes the password on the blocking
/// pool and stores the account.
pub async fn register(
    db: &Database,
    username: &str,
    password: &str,
) -> Result<User, RegistrationError> {
    validate_username(username)?;
    super::validate_password(password)?;

    let repo = UserRepository::new(db.pool());
    if repo.username_exists(username).await? {
        return Err(RegistrationError::UsernameExists);
    }

    let owned = password.to_string();
    let hash = tokio::task::spawn_blocking(move || hash_password(&owned))
        .await
        .map_err(|e| PasswordError::HashError(e.to_string()))??;

    // The UNIQUE constraint still guards against a concurrent registration.
    let user = repo
        .create(&NewUser::new(username, hash))
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RegistrationError::UsernameExists
            } else {
                RegistrationError::from(e)
            }
        })?;

    info!("Registered user {} ({})", user.username, user.id);
    Ok(user)
}

fn is_unique_violation(e: &crate::HuddleError) -> bool {
    matches!(e, crate::HuddleError::Database(msg) if msg.contains("UNIQUE"))
}
