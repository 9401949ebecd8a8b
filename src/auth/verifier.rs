//! Credential verification used when a chat connection authenticates.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use tracing::debug;

use crate::auth::verify_password;
use crate::db::UserRepository;
use crate::{Database, HuddleError, Result};

/// Outcome of a credential check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verification {
    /// Credentials are valid. Carries the canonical username.
    Valid { username: String },
    /// Unknown user or wrong password.
    Invalid,
}

/// Checks a username/password pair against an account store.
///
/// An `Err` means the store itself failed, not that the credentials are wrong.
#[async_trait]
pub trait AccountVerifier: Send + Sync {
    async fn verify(&self, username: &str, password: &str) -> Result<Verification>;
}

/// Verifier backed by the `users` table.
#[derive(Clone)]
pub struct DbAccountVerifier {
    db: Database,
}

impl DbAccountVerifier {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl AccountVerifier for DbAccountVerifier {
    async fn verify(&self, username: &str, password: &str) -> Result<Verification> {
        let Some(user) = UserRepository::new(self.db.pool())
            .get_by_username(username)
            .await?
        else {
            debug!("Login attempt for unknown user {}", username);
            return Ok(Verification::Invalid);
        };

        let password = password.to_string();
        let hash = user.password.clone();
        let matches = tokio::task::spawn_blocking(move || verify_password(&password, &hash).is_ok())
            .await
            .map_err(|e| HuddleError::Auth(format!("verification task failed: {e}")))?;

        if matches {
            Ok(Verification::Valid {
                username: user.username,
            })
        } else {
            Ok(Verification::Invalid)
        }
    }
}

/// In-process account table with plain-text passwords.
///
/// For tests and embedding only; nothing is persisted.
#[derive(Default)]
pub struct MemoryAccounts {
    accounts: RwLock<HashMap<String, String>>,
}

impl MemoryAccounts {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from `(username, password)` pairs.
    pub fn with_accounts<'a>(accounts: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let table = Self::new();
        for (username, password) in accounts {
            table.insert(username, password);
        }
        table
    }

    /// Add or replace an account.
    pub fn insert(&self, username: impl Into<String>, password: impl Into<String>) {
        self.accounts
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(username.into(), password.into());
    }
}

#[async_trait]
impl AccountVerifier for MemoryAccounts {
    async fn verify(&self, username: &str, password: &str) -> Result<Verification> {
        let accounts = self.accounts.read().unwrap_or_else(PoisonError::into_inner);
        match accounts.get(username) {
            Some(stored) if stored == password => Ok(Verification::Valid {
                username: username.to_string(),
            }),
            _ => Ok(Verification::Invalid),
        }
    }
}
