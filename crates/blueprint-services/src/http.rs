use crate::{BlueprintService, Enhancement, ImagePayload, ServiceConfig, ServiceError, ServiceResult};
use async_trait::async_trait;
use blueprint_common::{Blueprint, BlueprintError, GeneratedFiles};
use reqwest::{multipart, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

/// JSON-over-HTTP client for the conversion, generation and enhance backend.
///
/// Never retries; a failed call is reported once and the caller decides.
pub struct HttpBlueprintService {
    config: ServiceConfig,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct ConvertResponse {
    blueprint: Blueprint,
}

#[derive(Deserialize)]
struct GenerateResponse {
    files: GeneratedFiles,
}

impl HttpBlueprintService {
    pub fn new(config: ServiceConfig) -> blueprint_common::Result<Self> {
        if config.base_url.trim().is_empty() {
            return Err(BlueprintError::Config("service base URL is required".to_string()));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| BlueprintError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    async fn call<T: DeserializeOwned>(&self, operation: &str, request: RequestBuilder) -> ServiceResult<T> {
        let start = Instant::now();
        debug!("Calling {} service", operation);

        let response = request.send().await.map_err(transport_error)?;
        let status = response.status();
        let body = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            let message = failure_message(status, &body);
            warn!("{} service failed with {}: {}", operation, status, message);
            return Err(if is_gateway_status(status) {
                ServiceError::Transport(message)
            } else {
                ServiceError::Rejected(message)
            });
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| ServiceError::Rejected(format!("malformed {} response: {}", operation, e)))?;

        // Some endpoints report refusals inside a 200 body.
        if let Some(message) = value.get("error").and_then(Value::as_str) {
            warn!("{} service rejected the request: {}", operation, message);
            return Err(ServiceError::Rejected(message.to_string()));
        }

        let parsed = serde_json::from_value(value)
            .map_err(|e| ServiceError::Rejected(format!("malformed {} response: {}", operation, e)))?;

        info!("{} service call succeeded (took {:?})", operation, start.elapsed());
        Ok(parsed)
    }
}

#[async_trait]
impl BlueprintService for HttpBlueprintService {
    async fn convert(&self, image: &ImagePayload) -> ServiceResult<Blueprint> {
        let part = multipart::Part::bytes(image.bytes.clone())
            .file_name(image.file_name.clone())
            .mime_str(&image.mime_type)
            .map_err(|e| ServiceError::Rejected(format!("invalid image type: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let request = self
            .client
            .post(self.config.endpoint(&self.config.upload_path))
            .multipart(form);

        let response: ConvertResponse = self.call("convert", request).await?;
        Ok(response.blueprint)
    }

    async fn generate(&self, blueprint: &Blueprint) -> ServiceResult<GeneratedFiles> {
        let request = self
            .client
            .post(self.config.endpoint(&self.config.generate_path))
            .json(&json!({ "blueprint": blueprint }));

        let response: GenerateResponse = self.call("generate", request).await?;
        Ok(response.files)
    }

    async fn enhance(&self, blueprint: &Blueprint, command: &str) -> ServiceResult<Enhancement> {
        let request = self
            .client
            .post(self.config.endpoint(&self.config.enhance_path))
            .json(&json!({ "blueprint": blueprint, "command": command }));

        self.call("enhance", request).await
    }
}

fn transport_error(err: reqwest::Error) -> ServiceError {
    if err.is_timeout() {
        ServiceError::Transport(format!("request timed out: {}", err))
    } else {
        ServiceError::Transport(err.to_string())
    }
}

fn is_gateway_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::BAD_GATEWAY | StatusCode::SERVICE_UNAVAILABLE | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Prefer the service's own `error`/`message` field, then the raw body.
fn failure_message(status: StatusCode, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(body) {
        for key in ["error", "message", "detail"] {
            if let Some(message) = value.get(key).and_then(Value::as_str) {
                return message.to_string();
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("service responded with {}", status)
    } else {
        body.to_string()
    }
}
