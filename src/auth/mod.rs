use crate::state::AppState;
use axum::Router;

mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use dto::{Claims, JwtKeys, LoginRequest, SignupRequest, TokenResponse};

pub fn router() -> Router<AppState> {
    handlers::auth_routes()
}
