mod http;

pub use http::HttpBlueprintService;

use async_trait::async_trait;
use blueprint_common::{Blueprint, BlueprintError, GeneratedFiles};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Failure reported by a backend call.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ServiceError {
    /// The service answered but refused the request. Message is shown as-is.
    #[error("{0}")]
    Rejected(String),

    /// The request never got a usable answer (connect, timeout, gateway).
    #[error("{0}")]
    Transport(String),
}

impl From<ServiceError> for BlueprintError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Rejected(message) => BlueprintError::UpstreamRejected(message),
            ServiceError::Transport(cause) => BlueprintError::TransportFailure(cause),
        }
    }
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;

/// Uploaded sketch image.
#[derive(Debug, Clone, PartialEq)]
pub struct ImagePayload {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl ImagePayload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let file_name = file_name.into();
        let mime_type = mime_for(&file_name).to_string();
        Self {
            file_name,
            mime_type,
            bytes,
        }
    }

    pub async fn from_path(path: impl AsRef<Path>) -> blueprint_common::Result<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "sketch".to_string());
        Ok(Self::new(file_name, bytes))
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "bmp" => "image/bmp",
        _ => "application/octet-stream",
    }
}

/// Successful answer of the enhance service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enhancement {
    pub patched_blueprint: Blueprint,
    #[serde(default)]
    pub summary: String,
}

/// The three backend operations the studio relies on.
#[async_trait]
pub trait BlueprintService: Send + Sync {
    /// Turn a sketch image into a blueprint.
    async fn convert(&self, image: &ImagePayload) -> ServiceResult<Blueprint>;

    /// Generate source files from a blueprint.
    async fn generate(&self, blueprint: &Blueprint) -> ServiceResult<GeneratedFiles>;

    /// Apply a natural-language edit command, returning a full replacement document.
    async fn enhance(&self, blueprint: &Blueprint, command: &str) -> ServiceResult<Enhancement>;
}

/// Where the backend lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub upload_path: String,
    pub generate_path: String,
    pub enhance_path: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout: Duration::from_secs(60),
            upload_path: "/upload".to_string(),
            generate_path: "/generate".to_string(),
            enhance_path: "/enhance".to_string(),
        }
    }
}

impl ServiceConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Reads `BLUEPRINT_API_URL` and `BLUEPRINT_API_TIMEOUT_SECS`, falling back to defaults.
    pub fn from_env() -> blueprint_common::Result<Self> {
        let mut config = Self::default();

        if let Ok(url) = std::env::var("BLUEPRINT_API_URL") {
            config.base_url = url;
        }
        if let Ok(secs) = std::env::var("BLUEPRINT_API_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                BlueprintError::Config(format!("BLUEPRINT_API_TIMEOUT_SECS is not a number: {}", secs))
            })?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path.trim_start_matches('/'))
    }
}
