use anyhow::{anyhow, Context};
use reqwest::multipart;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    Image,
    Video,
    Raw,
    Auto,
}

impl ResourceType {
    fn as_str(&self) -> &str {
        match self {
            ResourceType::Image => "image",
            ResourceType::Video => "video",
            ResourceType::Raw => "raw",
            ResourceType::Auto => "auto",
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub secure_url: String,
    pub public_id: String,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub bytes: i64,
}

#[derive(Clone)]
pub struct CloudinaryClient {
    cloud_name: String,
    api_key: String,
    api_secret: String,
    http: reqwest::Client,
}

impl CloudinaryClient {
    pub fn new(
        cloud_name: impl Into<String>,
        api_key: impl Into<String>,
        api_secret: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            http,
        }
    }

    // Upload payload inline (data URI) ke Cloudinary dengan signed request
    pub async fn upload_data_uri(
        &self,
        data_uri: &str,
        resource_type: ResourceType,
        folder: &str,
    ) -> anyhow::Result<UploadResponse> {
        if data_uri.trim().is_empty() {
            return Err(anyhow!("payload upload kosong"));
        }

        let url = self.build_upload_url(resource_type);
        let timestamp = chrono::Utc::now().timestamp().to_string();
        let signature = self.sign(&[("folder", folder), ("timestamp", &timestamp)]);

        let form = multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("folder", folder.to_string())
            .text("timestamp", timestamp)
            .text("signature_algorithm", "sha256")
            .text("signature", signature)
            .text("file", data_uri.to_string());

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .context("request upload ke Cloudinary gagal")?;

        if !response.status().is_success() {
            let status = response.status();
            let err = response.text().await.unwrap_or_default();
            return Err(anyhow!("Upload failed ({}): {}", status, err));
        }

        let uploaded: UploadResponse = response
            .json()
            .await
            .context("response Cloudinary tidak valid")?;

        tracing::debug!("Cloudinary upload selesai: {} ({} bytes)", uploaded.public_id, uploaded.bytes);

        Ok(uploaded)
    }

    // Build upload URL berdasarkan resource type
    fn build_upload_url(&self, resource_type: ResourceType) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/{}/upload",
            self.cloud_name,
            resource_type.as_str()
        )
    }

    // Signature: parameter diurutkan alfabetis, digabung dengan '&', lalu ditambah api_secret
    fn sign(&self, params: &[(&str, &str)]) -> String {
        let mut sorted = params.to_vec();
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let joined = sorted
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join("&");

        let mut hasher = Sha256::new();
        hasher.update(joined.as_bytes());
        hasher.update(self.api_secret.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}
