use crate::auth::repo_types::{ChatLink, User};
use sqlx::PgPool;
use uuid::Uuid;

impl User {
    /// Find a user by username.
    pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, password_hash, created_at
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(db: &PgPool, username: &str, password_hash: &str) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, password_hash)
            VALUES ($1, $2)
            RETURNING id, username, password_hash, created_at
            "#,
        )
        .bind(username)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }
}

impl ChatLink {
    /// Store (or refresh) the access token issued for a chat.
    pub async fn upsert(
        db: &PgPool,
        chat_id: i64,
        user_id: Uuid,
        access_token: &str,
    ) -> anyhow::Result<ChatLink> {
        let link = sqlx::query_as::<_, ChatLink>(
            r#"
            INSERT INTO chat_links (chat_id, user_id, access_token)
            VALUES ($1, $2, $3)
            ON CONFLICT (chat_id)
            DO UPDATE SET user_id = $2, access_token = $3, linked_at = now()
            RETURNING chat_id, user_id, access_token, linked_at
            "#,
        )
        .bind(chat_id)
        .bind(user_id)
        .bind(access_token)
        .fetch_one(db)
        .await?;
        Ok(link)
    }

    pub async fn find(db: &PgPool, chat_id: i64) -> anyhow::Result<Option<ChatLink>> {
        let link = sqlx::query_as::<_, ChatLink>(
            r#"
            SELECT chat_id, user_id, access_token, linked_at
            FROM chat_links
            WHERE chat_id = $1
            "#,
        )
        .bind(chat_id)
        .fetch_optional(db)
        .await?;
        Ok(link)
    }
}
