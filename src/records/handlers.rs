use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use time::OffsetDateTime;
use tracing::{error, instrument};
use uuid::Uuid;

use crate::auth::services::AuthUser;
use crate::records::dto::{
    CalculationRequest, CreateGoalRequest, CreateMealRequest, CreateReminderRequest,
    CreateWaterRequest, MessageResponse, SummaryResponse, TipResponse,
};
use crate::records::services::{self, ServiceError};
use crate::state::AppState;

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/summary/:user_id", get(get_summary))
        .route("/tips", get(get_tip))
}

pub fn write_routes() -> Router<AppState> {
    Router::new()
        .route("/meals", post(create_meal))
        .route("/goals", post(create_goal))
        .route("/water", post(create_water))
        .route("/calculations", post(create_calculation))
        .route("/reminders", post(create_reminder))
}

fn service_error(e: ServiceError) -> (StatusCode, String) {
    match e {
        ServiceError::Invalid(msg) => (StatusCode::BAD_REQUEST, msg),
        ServiceError::Internal(e) => {
            error!(error = %e, "record operation failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

#[instrument(skip(state, payload))]
pub async fn create_meal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateMealRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let message = services::record_meal(
        &state.db,
        &state.foods,
        user_id,
        payload.meal_type,
        payload.food_id,
        payload.quantity,
    )
    .await
    .map_err(service_error)?;
    Ok(Json(MessageResponse { message }))
}

#[instrument(skip(state, payload))]
pub async fn create_goal(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateGoalRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let message = services::set_goal(&state.db, user_id, payload.nutrient, payload.value)
        .await
        .map_err(service_error)?;
    Ok(Json(MessageResponse { message }))
}

#[instrument(skip(state, payload))]
pub async fn create_water(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateWaterRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let (message, _total) = services::register_water(&state.db, user_id, payload.amount)
        .await
        .map_err(service_error)?;
    Ok(Json(MessageResponse { message }))
}

#[instrument(skip(state, payload))]
pub async fn create_calculation(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CalculationRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let message = services::perform_calculation(&state.db, user_id, &payload)
        .await
        .map_err(service_error)?;
    Ok(Json(MessageResponse { message }))
}

#[instrument(skip(state, payload))]
pub async fn create_reminder(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<CreateReminderRequest>,
) -> Result<Json<MessageResponse>, (StatusCode, String)> {
    let message = services::set_reminder(
        &state.db,
        &state.reminders,
        user_id,
        payload.kind,
        &payload.time,
    )
    .await
    .map_err(service_error)?;
    Ok(Json(MessageResponse { message }))
}

#[instrument(skip(state))]
pub async fn get_summary(
    State(state): State<AppState>,
    AuthUser(token_user): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<SummaryResponse>, (StatusCode, String)> {
    if token_user != user_id {
        return Err((
            StatusCode::UNAUTHORIZED,
            "Invalid user ID for this token".into(),
        ));
    }
    let date = OffsetDateTime::now_utc().date();
    let summary = services::build_daily_summary(&state.db, &state.foods, user_id, date)
        .await
        .map_err(service_error)?;
    Ok(Json(summary))
}

#[instrument]
pub async fn get_tip() -> Json<TipResponse> {
    let day = OffsetDateTime::now_utc().date().day();
    Json(TipResponse {
        tip: services::daily_tip(day).to_string(),
    })
}
