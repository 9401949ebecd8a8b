//! Authentication module for Huddle.
//!
//! Password hashing, account registration and the credential verifiers
//! consulted when a chat connection authenticates.

mod password;
mod registration;
pub mod validation;
mod verifier;

pub use password::{hash_password, validate_password, verify_password, PasswordError};
pub use registration::{register, RegistrationError};
pub use validation::{validate_username, ValidationError};
pub use verifier::{AccountVerifier, DbAccountVerifier, MemoryAccounts, Verification};
