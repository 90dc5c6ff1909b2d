// Konfigurasi Messaging Service
use serde::Serialize;
use sqlx::{PgPool, postgres::PgConnectOptions, postgres::PgPoolOptions};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use shared::utils::cloudinary::CloudinaryClient;

use crate::messaging::MessagingService;
use crate::realtime::{DeliveryGateway, PresenceRegistry, SeenSynchronizer};
use crate::repositories::{ChatStore, InMemoryStore, PgStore};
use crate::utils::media::{CloudinaryResolver, MediaResolver, UnconfiguredResolver};

const DEFAULT_MAX_BODY_BYTES: usize = 50 * 1024 * 1024;

// Health check response structure
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct HealthCheckResponse {
    pub service: String,
    pub status: String,
    pub version: String,
    pub storage: String,
    pub database: String,
    pub online_users: usize,
    pub connections: usize,
    pub timestamp: String,
}

#[derive(Debug, Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

// Application configuration yang di-load dari environment variables
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub frontend_url: Option<String>,
    pub max_body_bytes: usize,
    pub cloudinary: Option<CloudinaryConfig>,
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl AppConfig {
    // Load semua konfigurasi dari environment variables dengan validasi
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| "JWT_SECRET harus diset di environment")?;

        // Validasi JWT secret tidak menggunakan default value di production
        if !cfg!(debug_assertions) && jwt_secret.contains("change-this") {
            return Err("JWT_SECRET masih menggunakan default value! Ganti dengan value yang aman untuk production".to_string());
        }

        let server_host = env::var("MESSAGING_SERVICE_HOST")
            .unwrap_or_else(|_| "0.0.0.0".to_string());

        let server_port = match env::var("MESSAGING_SERVICE_PORT") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| format!("MESSAGING_SERVICE_PORT tidak valid: {}", raw))?,
            Err(_) => 3002,
        };

        let environment = env::var("RUST_ENV")
            .unwrap_or_else(|_| "development".to_string());

        let max_body_bytes = match env::var("MAX_BODY_BYTES") {
            Ok(raw) => raw
                .parse()
                .map_err(|_| format!("MAX_BODY_BYTES tidak valid: {}", raw))?,
            Err(_) => DEFAULT_MAX_BODY_BYTES,
        };

        // Cloudinary opsional, tapi kalau diset harus lengkap
        let cloudinary = match (
            optional_var("CLOUDINARY_CLOUD_NAME"),
            optional_var("CLOUDINARY_API_KEY"),
            optional_var("CLOUDINARY_API_SECRET"),
        ) {
            (Some(cloud_name), Some(api_key), Some(api_secret)) => Some(CloudinaryConfig {
                cloud_name,
                api_key,
                api_secret,
            }),
            (None, None, None) => None,
            _ => {
                return Err("CLOUDINARY_CLOUD_NAME, CLOUDINARY_API_KEY, dan CLOUDINARY_API_SECRET harus diset bersamaan".to_string());
            }
        };

        Ok(AppConfig {
            database_url: optional_var("DATABASE_URL"),
            server_host,
            server_port,
            environment,
            jwt_secret,
            frontend_url: optional_var("FRONTEND_URL"),
            max_body_bytes,
            cloudinary,
        })
    }

    // Helper cek production mode
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn host(&self) -> &str {
        &self.server_host
    }

    pub fn port(&self) -> u16 {
        self.server_port
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }

    #[cfg(test)]
    pub fn for_tests(jwt_secret: &str) -> Self {
        AppConfig {
            database_url: None,
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            environment: "test".to_string(),
            jwt_secret: jwt_secret.to_string(),
            frontend_url: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            cloudinary: None,
        }
    }
}

// Inisialisasi database connection pool dengan optimal configuration
pub async fn init_db_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    tracing::info!("🔌 Initializing Messaging Service database connection...");

    // Parse connection options dan disable prepared statements untuk Supabase
    let options = PgConnectOptions::from_str(database_url)?
        .statement_cache_capacity(0);

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .min_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(300))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect_with(options)
        .await?;

    tracing::info!("✅ Messaging Service database pool initialized successfully");
    Ok(pool)
}

// Health check database connection
pub async fn check_db_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1")
        .fetch_optional(pool)
        .await
        .is_ok()
}

// Application state yang di-share ke semua handlers
#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub db: Option<PgPool>,
    pub store: Arc<dyn ChatStore>,
    pub presence: PresenceRegistry,
    pub seen: SeenSynchronizer,
    pub messaging: MessagingService,
}

impl axum::extract::FromRef<AppState> for AppConfig {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl axum::extract::FromRef<AppState> for PresenceRegistry {
    fn from_ref(state: &AppState) -> Self {
        state.presence.clone()
    }
}

impl AppState {
    // Inisialisasi application state
    pub async fn new(config: AppConfig) -> Result<Self, String> {
        let (db, store): (Option<PgPool>, Arc<dyn ChatStore>) = match &config.database_url {
            Some(url) => {
                let pool = init_db_pool(url)
                    .await
                    .map_err(|e| format!("Failed to init database: {}", e))?;
                let store = PgStore::new(pool.clone());
                store
                    .migrate()
                    .await
                    .map_err(|e| format!("Failed to run migrations: {}", e))?;
                (Some(pool), Arc::new(store))
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL tidak diset, memakai in-memory store (data hilang saat restart)");
                (None, Arc::new(InMemoryStore::new()))
            }
        };

        let media: Arc<dyn MediaResolver> = match &config.cloudinary {
            Some(cloudinary) => {
                let http_client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(30))
                    .build()
                    .map_err(|e| format!("Failed to create HTTP client: {}", e))?;
                Arc::new(CloudinaryResolver::new(CloudinaryClient::new(
                    &cloudinary.cloud_name,
                    &cloudinary.api_key,
                    &cloudinary.api_secret,
                    http_client,
                )))
            }
            None => {
                tracing::warn!("⚠️ Cloudinary belum dikonfigurasi, message dengan gambar/audio akan ditolak");
                Arc::new(UnconfiguredResolver)
            }
        };

        let mut state = Self::with_parts(config, store, media);
        state.db = db;
        Ok(state)
    }

    /// Rakit state dari komponen yang sudah jadi
    pub fn with_parts(config: AppConfig, store: Arc<dyn ChatStore>, media: Arc<dyn MediaResolver>) -> Self {
        let presence = PresenceRegistry::new();
        let gateway = DeliveryGateway::new(presence.clone());

        AppState {
            config,
            db: None,
            seen: SeenSynchronizer::new(store.clone(), gateway.clone()),
            messaging: MessagingService::new(store.clone(), media, gateway),
            store,
            presence,
        }
    }

    // Health check semua dependencies
    pub async fn health_check(&self) -> HealthCheckResponse {
        let database = match &self.db {
            Some(pool) if check_db_health(pool).await => "connected",
            Some(_) => "disconnected",
            None => "not_configured",
        };

        let status = if database == "disconnected" { "degraded" } else { "healthy" };

        HealthCheckResponse {
            service: "messaging-service".to_string(),
            status: status.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            storage: self.store.backend().to_string(),
            database: database.to_string(),
            online_users: self.presence.online_users().await.len(),
            connections: self.presence.connection_count().await,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}
