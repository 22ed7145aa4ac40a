use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub created_at: OffsetDateTime,
}

/// Link between a delivery-channel chat and an account, holding the last
/// issued access token. One row per chat; refreshed on every signup/login.
#[derive(Debug, Clone, FromRow)]
pub struct ChatLink {
    pub chat_id: i64,
    pub user_id: Uuid,
    pub access_token: String,
    pub linked_at: OffsetDateTime,
}
