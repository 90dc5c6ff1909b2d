// Media Resolver: attachment inline (base64) -> URL durable sebelum message dipersist
use async_trait::async_trait;
use shared::utils::cloudinary::{CloudinaryClient, ResourceType};

use crate::error::AppError;

const IMAGE_FOLDER: &str = "threads_img";
const AUDIO_FOLDER: &str = "threads_audio";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    Audio,
}

impl AttachmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttachmentKind::Image => "image",
            AttachmentKind::Audio => "audio",
        }
    }
}

#[async_trait]
pub trait MediaResolver: Send + Sync {
    /// Upload payload dan return URL. Payload kosong atau upload ditolak -> `AppError::Upload`.
    async fn resolve(&self, kind: AttachmentKind, payload: &str) -> Result<String, AppError>;
}

/// Resolve attachment opsional. None berarti tidak ada attachment, bukan error.
pub async fn resolve_optional(
    resolver: &dyn MediaResolver,
    kind: AttachmentKind,
    payload: Option<&str>,
) -> Result<Option<String>, AppError> {
    match payload.filter(|p| !p.trim().is_empty()) {
        Some(payload) => resolver.resolve(kind, payload).await.map(Some),
        None => Ok(None),
    }
}

// Client mengirim audio sebagai base64 mentah, gambar sudah berupa data URI
fn audio_data_uri(payload: &str) -> String {
    if payload.starts_with("data:") {
        payload.to_string()
    } else {
        format!("data:audio/mp3;base64,{}", payload)
    }
}

pub struct CloudinaryResolver {
    client: CloudinaryClient,
}

impl CloudinaryResolver {
    pub fn new(client: CloudinaryClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl MediaResolver for CloudinaryResolver {
    async fn resolve(&self, kind: AttachmentKind, payload: &str) -> Result<String, AppError> {
        if payload.trim().is_empty() || payload == "undefined" {
            return Err(AppError::upload(format!("Payload {} kosong", kind.as_str())));
        }

        let upload = match kind {
            AttachmentKind::Image => {
                self.client
                    .upload_data_uri(payload, ResourceType::Image, IMAGE_FOLDER)
                    .await
            }
            AttachmentKind::Audio => {
                self.client
                    .upload_data_uri(&audio_data_uri(payload), ResourceType::Auto, AUDIO_FOLDER)
                    .await
            }
        }
        .map_err(|e| {
            tracing::error!("Upload {} ke Cloudinary gagal: {:#}", kind.as_str(), e);
            AppError::upload(format!("Gagal upload {}", kind.as_str()))
        })?;

        Ok(upload.secure_url)
    }
}

/// Dipakai kalau kredensial Cloudinary tidak diset: setiap attachment ditolak
pub struct UnconfiguredResolver;

#[async_trait]
impl MediaResolver for UnconfiguredResolver {
    async fn resolve(&self, kind: AttachmentKind, _payload: &str) -> Result<String, AppError> {
        Err(AppError::upload(format!(
            "Upload {} tidak tersedia: media storage belum dikonfigurasi",
            kind.as_str()
        )))
    }
}
