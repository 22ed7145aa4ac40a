use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use tracing::{error, info, instrument};

use crate::auth::{
    dto::{JwtKeys, LoginRequest, SignupRequest, TokenResponse},
    services::{login_user, register_user, AuthError},
};
use crate::state::AppState;

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/users", post(signup))
        .route("/login", post(login))
}

fn auth_status(e: &AuthError) -> StatusCode {
    match e {
        AuthError::InvalidUsername | AuthError::WeakPassword | AuthError::UsernameTaken => {
            StatusCode::BAD_REQUEST
        }
        AuthError::BadCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[instrument(skip(state, payload))]
pub async fn signup(
    State(state): State<AppState>,
    Json(payload): Json<SignupRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    match register_user(&state.db, &keys, &payload.username, &payload.password).await {
        Ok((user, token)) => {
            info!(user_id = %user.id, username = %user.username, "user registered");
            Ok(Json(TokenResponse::bearer(token)))
        }
        Err(e) => {
            if matches!(e, AuthError::Internal(_)) {
                error!(error = %e, "signup failed");
            }
            Err((auth_status(&e), e.to_string()))
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, (StatusCode, String)> {
    let keys = JwtKeys::from_ref(&state);
    match login_user(&state.db, &keys, &payload.username, &payload.password).await {
        Ok((user, token)) => {
            info!(user_id = %user.id, username = %user.username, "user logged in");
            Ok(Json(TokenResponse::bearer(token)))
        }
        Err(e) => {
            if matches!(e, AuthError::Internal(_)) {
                error!(error = %e, "login failed");
            }
            Err((auth_status(&e), e.to_string()))
        }
    }
}
