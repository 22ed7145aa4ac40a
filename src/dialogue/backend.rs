use async_trait::async_trait;
use sqlx::PgPool;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::info;
use uuid::Uuid;

use crate::auth::repo_types::ChatLink;
use crate::auth::services::{login_user, register_user, AuthError};
use crate::auth::JwtKeys;
use crate::foods::FoodTable;
use crate::notifier::ReminderScheduler;
use crate::records::dto::CalculationRequest;
use crate::records::repo_types::{MealType, Nutrient, ReminderKind};
use crate::records::services::{self, ServiceError};

/// What a terminal write can come back with, mirroring the error classes the
/// engine must tell apart when phrasing its reply.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("not authenticated")]
    Unauthorized,
    #[error("username already exists")]
    UsernameTaken,
    #[error("bad credentials")]
    BadCredentials,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Unavailable(#[from] anyhow::Error),
}

impl From<ServiceError> for BackendError {
    fn from(e: ServiceError) -> Self {
        match e {
            ServiceError::Invalid(msg) => BackendError::Invalid(msg),
            ServiceError::Internal(e) => BackendError::Unavailable(e),
        }
    }
}

impl From<AuthError> for BackendError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::InvalidUsername => BackendError::Invalid(
                "Nome de usuário inválido. Use 3-32 letras, números, '.', '-' ou '_'.".into(),
            ),
            AuthError::WeakPassword => {
                BackendError::Invalid("A senha deve ter pelo menos 8 caracteres.".into())
            }
            AuthError::UsernameTaken => BackendError::UsernameTaken,
            AuthError::BadCredentials => BackendError::BadCredentials,
            AuthError::Internal(e) => BackendError::Unavailable(e),
        }
    }
}

/// Everything the dialogue engine needs from the rest of the system. One
/// call per completed flow; the engine never touches storage directly.
#[async_trait]
pub trait Backend: Send + Sync {
    async fn signup(&self, chat_id: i64, username: &str, password: &str)
        -> Result<(), BackendError>;
    async fn login(&self, chat_id: i64, username: &str, password: &str)
        -> Result<(), BackendError>;
    /// Whether the chat holds a valid (unexpired) credential.
    async fn is_authenticated(&self, chat_id: i64) -> bool;
    async fn insert_meal(
        &self,
        chat_id: i64,
        meal_type: MealType,
        food_id: i64,
        quantity_g: f64,
    ) -> Result<String, BackendError>;
    async fn upsert_goal(
        &self,
        chat_id: i64,
        nutrient: Nutrient,
        value: f64,
    ) -> Result<String, BackendError>;
    async fn insert_water(&self, chat_id: i64, amount_ml: f64) -> Result<String, BackendError>;
    async fn run_calculation(
        &self,
        chat_id: i64,
        input: CalculationRequest,
    ) -> Result<String, BackendError>;
    async fn upsert_reminder(
        &self,
        chat_id: i64,
        kind: ReminderKind,
        time: &str,
    ) -> Result<String, BackendError>;
    async fn daily_summary(&self, chat_id: i64) -> Result<String, BackendError>;
    async fn daily_tip(&self) -> Result<String, BackendError>;
}

/// Production backend: the record store plus credential issuance, fronted by
/// the same bearer-token check the HTTP surface applies.
pub struct StoreBackend {
    db: PgPool,
    keys: JwtKeys,
    foods: Arc<FoodTable>,
    scheduler: Arc<ReminderScheduler>,
}

impl StoreBackend {
    pub fn new(
        db: PgPool,
        keys: JwtKeys,
        foods: Arc<FoodTable>,
        scheduler: Arc<ReminderScheduler>,
    ) -> Self {
        Self {
            db,
            keys,
            foods,
            scheduler,
        }
    }

    /// Resolve the chat's stored token to a user id, rejecting missing,
    /// malformed or expired credentials.
    async fn authed(&self, chat_id: i64) -> Result<Uuid, BackendError> {
        let link = ChatLink::find(&self.db, chat_id)
            .await
            .map_err(BackendError::Unavailable)?
            .ok_or(BackendError::Unauthorized)?;
        let claims = self
            .keys
            .verify(&link.access_token)
            .map_err(|_| BackendError::Unauthorized)?;
        Ok(claims.sub)
    }
}

#[async_trait]
impl Backend for StoreBackend {
    async fn signup(
        &self,
        chat_id: i64,
        username: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        let (user, token) = register_user(&self.db, &self.keys, username, password).await?;
        ChatLink::upsert(&self.db, chat_id, user.id, &token)
            .await
            .map_err(BackendError::Unavailable)?;
        info!(chat_id, user_id = %user.id, "chat linked after signup");
        Ok(())
    }

    async fn login(
        &self,
        chat_id: i64,
        username: &str,
        password: &str,
    ) -> Result<(), BackendError> {
        let (user, token) = login_user(&self.db, &self.keys, username, password).await?;
        ChatLink::upsert(&self.db, chat_id, user.id, &token)
            .await
            .map_err(BackendError::Unavailable)?;
        info!(chat_id, user_id = %user.id, "chat linked after login");
        Ok(())
    }

    async fn is_authenticated(&self, chat_id: i64) -> bool {
        self.authed(chat_id).await.is_ok()
    }

    async fn insert_meal(
        &self,
        chat_id: i64,
        meal_type: MealType,
        food_id: i64,
        quantity_g: f64,
    ) -> Result<String, BackendError> {
        let user_id = self.authed(chat_id).await?;
        let msg =
            services::record_meal(&self.db, &self.foods, user_id, meal_type, food_id, quantity_g)
                .await?;
        Ok(msg)
    }

    async fn upsert_goal(
        &self,
        chat_id: i64,
        nutrient: Nutrient,
        value: f64,
    ) -> Result<String, BackendError> {
        let user_id = self.authed(chat_id).await?;
        let msg = services::set_goal(&self.db, user_id, nutrient, value).await?;
        Ok(msg)
    }

    async fn insert_water(&self, chat_id: i64, amount_ml: f64) -> Result<String, BackendError> {
        let user_id = self.authed(chat_id).await?;
        let (msg, _total) = services::register_water(&self.db, user_id, amount_ml).await?;
        Ok(msg)
    }

    async fn run_calculation(
        &self,
        chat_id: i64,
        input: CalculationRequest,
    ) -> Result<String, BackendError> {
        let user_id = self.authed(chat_id).await?;
        let msg = services::perform_calculation(&self.db, user_id, &input).await?;
        Ok(msg)
    }

    async fn upsert_reminder(
        &self,
        chat_id: i64,
        kind: ReminderKind,
        time: &str,
    ) -> Result<String, BackendError> {
        let user_id = self.authed(chat_id).await?;
        let msg = services::set_reminder(&self.db, &self.scheduler, user_id, kind, time).await?;
        Ok(msg)
    }

    async fn daily_summary(&self, chat_id: i64) -> Result<String, BackendError> {
        let user_id = self.authed(chat_id).await?;
        let date = OffsetDateTime::now_utc().date();
        let summary = services::build_daily_summary(&self.db, &self.foods, user_id, date).await?;
        Ok(summary.text)
    }

    async fn daily_tip(&self) -> Result<String, BackendError> {
        let day = OffsetDateTime::now_utc().date().day();
        Ok(services::daily_tip(day).to_string())
    }
}
