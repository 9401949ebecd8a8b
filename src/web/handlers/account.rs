//! Account handlers.

use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::AppState;
use crate::web::error::ApiError;

/// Registration request.
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

/// Public view of an account.
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountResponse {
    pub id: i64,
    pub username: String,
}

/// Register a new account.
///
/// POST /v1/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AccountResponse>), ApiError> {
    let user = crate::auth::register(&state.db, &req.username, &req.password).await?;
    Ok((
        StatusCode::CREATED,
        Json(AccountResponse {
            id: user.id,
            username: user.username,
        }),
    ))
}
