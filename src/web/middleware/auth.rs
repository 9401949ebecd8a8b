//! HTTP Basic authentication.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use base64::{engine::general_purpose::STANDARD, Engine};
use tracing::{error, warn};

use crate::auth::Verification;
use crate::web::error::ApiError;
use crate::web::handlers::AppState;

/// Extractor for requests carrying valid Basic credentials.
///
/// Verified against the same account verifier the chat sessions use.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Canonical username of the account.
    pub username: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let (username, password) = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(parse_basic)
            .ok_or_else(|| ApiError::unauthorized("missing credentials"))?;

        match state.chat.verifier().verify(&username, &password).await {
            Ok(Verification::Valid { username }) => Ok(AuthUser { username }),
            Ok(Verification::Invalid) => {
                warn!("Rejected credentials for {}", username);
                Err(ApiError::unauthorized("incorrect username or password"))
            }
            Err(e) => {
                error!("Account verifier failed: {}", e);
                Err(ApiError::unavailable("account service unavailable"))
            }
        }
    }
}

/// Decode an `Authorization: Basic ...` header value.
fn parse_basic(header: &str) -> Option<(String, String)> {
    let encoded = header.strip_prefix("Basic ")?.trim();
    let decoded = String::from_utf8(STANDARD.decode(encoded).ok()?).ok()?;
    let (username, password) = decoded.split_once(':')?;
    Some((username.to_string(), password.to_string()))
}
