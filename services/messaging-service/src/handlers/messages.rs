// Message Handlers untuk Messaging Service
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};

use crate::{
    config::AppState,
    domain::{Message, SendMessageRequest},
    error::AppError,
    middleware::AuthUser,
};

// Kirim message ke user lain. Conversation dibuat otomatis saat kontak pertama.
#[utoipa::path(
    post,
    path = "/api/messages",
    tag = "messages",
    security(("bearer_auth" = [])),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message berhasil dikirim", body = Message),
        (status = 400, description = "Upload attachment gagal"),
        (status = 401, description = "Unauthorized"),
        (status = 422, description = "Recipient atau isi message tidak valid"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn send_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(request): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), AppError> {
    let message = state.messaging.send(&auth.user_id, request).await?;
    Ok((StatusCode::CREATED, Json(message)))
}

// Semua message antara user login dan `other_user_id`, urut dari yang paling lama
#[utoipa::path(
    get,
    path = "/api/messages/{other_user_id}",
    tag = "messages",
    security(("bearer_auth" = [])),
    params(
        ("other_user_id" = String, Path, description = "ID user lawan bicara")
    ),
    responses(
        (status = 200, description = "Daftar message", body = Vec<Message>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Conversation tidak ditemukan"),
        (status = 422, description = "User ID tidak valid")
    )
)]
pub async fn get_messages(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(other_user_id): Path<String>,
) -> Result<Json<Vec<Message>>, AppError> {
    let messages = state
        .messaging
        .conversation_messages(&auth.user_id, &other_user_id)
        .await?;

    tracing::debug!(
        "User {} mengambil {} message dengan {}",
        auth.user_id, messages.len(), other_user_id
    );

    Ok(Json(messages))
}
