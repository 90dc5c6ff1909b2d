// Conversation Handlers untuk Messaging Service
use axum::{extract::State, response::Json};

use crate::{
    config::{AppState, HealthCheckResponse},
    domain::ConversationView,
    error::AppError,
    middleware::AuthUser,
};

// Daftar conversation user login, aktivitas terbaru duluan
#[utoipa::path(
    get,
    path = "/api/messages/conversations",
    tag = "conversations",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Daftar conversation tanpa user login di participants", body = Vec<ConversationView>),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<Vec<ConversationView>>, AppError> {
    let conversations = state.messaging.conversations_for(&auth.user_id).await?;
    Ok(Json(conversations))
}

// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Status service", body = HealthCheckResponse)
    )
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthCheckResponse> {
    Json(state.health_check().await)
}
