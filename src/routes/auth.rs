// SPDX-License-Identifier: MIT

//! Login route issuing session JWTs.

use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::models::User;
use crate::services::password::verify_password;
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use validator::Validate;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/login", post(login))
}

#[derive(Deserialize, Validate)]
struct LoginRequest {
    #[validate(email)]
    email: String,
    #[validate(length(min = 6))]
    password: String,
}

#[derive(Serialize)]
struct LoginResponse {
    token: String,
    user: User,
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    body.validate()
        .map_err(|_| AppError::BadRequest("Invalid email or password format".to_string()))?;

    // A uniform error for unknown email, inactive account, and bad
    // password; no account enumeration.
    let user = state
        .db
        .get_user_by_email(&body.email)
        .filter(|u| u.is_active)
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&body.password, &user.password_hash) {
        return Err(AppError::Unauthorized);
    }

    let token = create_jwt(user.id, user.role, &state.config.jwt_signing_key)?;

    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse { token, user }))
}
