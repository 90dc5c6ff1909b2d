// API Routes untuk Messaging Service

use crate::config::{AppConfig, AppState};
use crate::handlers::{conversations, messages, websocket};
use axum::{
    extract::{DefaultBodyLimit, Request},
    http::{header, HeaderName, HeaderValue, Method},
    middleware::Next,
    response::{Json, Response},
    routing::{get, post},
    Router,
};
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

// OpenAPI Documentation untuk Messaging Service
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Messaging Service API",
        version = "1.0.0",
        description = "Direct messaging 1:1 dengan presence dan seen receipt real-time.\n\nEvent real-time tersedia lewat WebSocket di `/ws?userId=<id>&token=<jwt>`.",
    ),
    paths(
        messages::send_message,
        messages::get_messages,
        conversations::get_conversations,
        conversations::health_check,
    ),
    components(
        schemas(
            crate::domain::Message,
            crate::domain::SendMessageRequest,
            crate::domain::ConversationView,
            crate::domain::LastMessage,
            crate::domain::UserId,
            crate::config::HealthCheckResponse,
        )
    ),
    tags(
        (name = "messages", description = "Kirim dan baca direct message"),
        (name = "conversations", description = "Daftar conversation"),
        (name = "health", description = "Status service")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

// Security scheme modifier untuk Bearer JWT authentication
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

// Security headers middleware
async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static("default-src 'self'; img-src 'self' data: https:; media-src 'self' data: https:; frame-ancestors 'none';"),
    );
    headers.insert(header::X_CONTENT_TYPE_OPTIONS, HeaderValue::from_static("nosniff"));
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::X_XSS_PROTECTION, HeaderValue::from_static("1; mode=block"));
    headers.insert(header::REFERRER_POLICY, HeaderValue::from_static("strict-origin-when-cross-origin"));
    headers.insert(
        HeaderName::from_static("permissions-policy"),
        HeaderValue::from_static("camera=(), microphone=(), geolocation=()"),
    );
    headers.insert(
        header::STRICT_TRANSPORT_SECURITY,
        HeaderValue::from_static("max-age=31536000; includeSubDomains"),
    );

    response
}

// CORS dari FRONTEND_URL; tanpa FRONTEND_URL semua origin diizinkan (development)
fn build_cors(config: &AppConfig) -> CorsLayer {
    let Some(frontend_url) = config.frontend_url.as_deref() else {
        tracing::warn!("⚠️ FRONTEND_URL tidak diset, CORS mengizinkan semua origin");
        return CorsLayer::permissive();
    };

    let allowed_origin = match frontend_url.parse::<HeaderValue>() {
        Ok(origin) => origin,
        Err(_) => {
            tracing::error!("❌ FRONTEND_URL tidak valid ({}), request cross-origin ditolak", frontend_url);
            return CorsLayer::new();
        }
    };

    CorsLayer::new()
        .allow_origin(allowed_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::ACCEPT, header::CONTENT_TYPE])
        .allow_credentials(false)
        .max_age(Duration::from_secs(86400))
}

// Buat router lengkap: REST, WebSocket, docs, dan shared middleware
pub fn create_router(state: AppState) -> Router {
    if state.config.is_production() {
        tracing::warn!("Messaging Service running in PRODUCTION mode");
    } else {
        tracing::info!("Messaging Service running in DEVELOPMENT mode");
    }

    let cors = build_cors(&state.config);
    let body_limit = DefaultBodyLimit::max(state.config.max_body_bytes);

    Router::new()
        .route("/health", get(conversations::health_check))
        .route("/api-docs/openapi.json", get(openapi_json))
        .route("/ws", get(websocket::websocket_handler))
        .nest("/api", build_api_routes())
        .layer(body_limit)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .layer(axum::middleware::from_fn(security_headers_middleware))
        .with_state(state)
}

// Build API routes, autentikasi lewat extractor AuthUser di setiap handler
fn build_api_routes() -> Router<AppState> {
    Router::new()
        .route("/messages", post(messages::send_message))
        .route("/messages/conversations", get(conversations::get_conversations))
        .route("/messages/{other_user_id}", get(messages::get_messages))
}
