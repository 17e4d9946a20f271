use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use blueprint_common::{Blueprint, BlueprintError, ComponentRef, GeneratedFiles};
use blueprint_pipeline::Studio;
use blueprint_services::ImagePayload;
use blueprint_store::{Pan, PageSummary, UiState};
use blueprint_view::{render_page, View, ViewMode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

type AppState = Arc<Studio>;

/// Sketch photos routinely exceed axum's default 2 MB body limit.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Error body: `{"error": "...", "kind": "..."}`.
struct ApiError(BlueprintError);

impl From<BlueprintError> for ApiError {
    fn from(err: BlueprintError) -> Self {
        Self(err)
    }
}

impl ApiError {
    fn status_and_kind(&self) -> (StatusCode, &'static str) {
        match &self.0 {
            BlueprintError::UnknownPage(_) => (StatusCode::NOT_FOUND, "unknown_page"),
            BlueprintError::NoActiveDocument(_) => (StatusCode::CONFLICT, "no_active_document"),
            BlueprintError::Superseded { .. } => (StatusCode::CONFLICT, "superseded"),
            BlueprintError::NothingToUndo(_) => (StatusCode::CONFLICT, "nothing_to_undo"),
            BlueprintError::EmptyCommand => (StatusCode::UNPROCESSABLE_ENTITY, "empty_command"),
            BlueprintError::EmptyImage => (StatusCode::UNPROCESSABLE_ENTITY, "empty_image"),
            BlueprintError::InvalidBlueprint(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_blueprint"),
            BlueprintError::InvalidSelection(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_selection"),
            BlueprintError::InvalidViewport(_) => (StatusCode::UNPROCESSABLE_ENTITY, "invalid_viewport"),
            BlueprintError::Config(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            BlueprintError::UpstreamRejected(_) => (StatusCode::BAD_GATEWAY, "upstream_rejected"),
            BlueprintError::TransportFailure(_) => (StatusCode::GATEWAY_TIMEOUT, "transport_failure"),
            BlueprintError::Io(_) | BlueprintError::Json(_) | BlueprintError::Generic(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, kind) = self.status_and_kind();
        (status, Json(json!({ "error": self.0.to_string(), "kind": kind }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Deserialize)]
struct ViewQuery {
    mode: Option<String>,
}

#[derive(Deserialize)]
struct EditRequest {
    command: String,
}

#[derive(Serialize)]
struct EditResponse {
    blueprint: Blueprint,
    summary: String,
    history_len: usize,
}

#[derive(Serialize)]
struct GenerateResponse {
    files: GeneratedFiles,
}

#[derive(Deserialize)]
struct SelectRequest {
    selection: Option<ComponentRef>,
}

#[derive(Deserialize)]
struct ViewportRequest {
    zoom: f64,
    #[serde(default)]
    pan: Pan,
}

pub fn router(studio: AppState) -> Router {
    Router::new()
        .route("/pages", get(list_pages))
        .route("/pages/:id", get(show_page))
        .route(
            "/pages/:id/upload",
            post(upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/pages/:id/edit", post(edit))
        .route("/pages/:id/generate", post(generate))
        .route("/pages/:id/undo", post(undo))
        .route("/pages/:id/select", post(select))
        .route("/pages/:id/viewport", post(viewport))
        .route("/pages/:id/viewport/reset", post(reset_viewport))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(studio)
}

async fn list_pages(State(studio): State<AppState>) -> Json<Vec<PageSummary>> {
    Json(studio.store().list_pages().collect())
}

async fn show_page(
    State(studio): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ViewQuery>,
) -> ApiResult<View> {
    let mode = query.mode.as_deref().unwrap_or("auto").parse::<ViewMode>()?;
    Ok(Json(render_page(studio.store(), &id, mode)?))
}

async fn upload(
    State(studio): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Blueprint> {
    let file_name = headers
        .get("x-file-name")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("sketch.png");
    let image = ImagePayload::new(file_name, body.to_vec());
    Ok(Json(studio.upload(&id, &image).await?))
}

async fn edit(
    State(studio): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<EditRequest>,
) -> ApiResult<EditResponse> {
    let outcome = studio.edit(&id, &request.command).await?;
    Ok(Json(EditResponse {
        blueprint: outcome.blueprint,
        summary: outcome.summary,
        history_len: outcome.history_len,
    }))
}

async fn generate(State(studio): State<AppState>, Path(id): Path<String>) -> ApiResult<GenerateResponse> {
    let files = studio.generate(&id).await?;
    Ok(Json(GenerateResponse { files }))
}

async fn undo(State(studio): State<AppState>, Path(id): Path<String>) -> ApiResult<Blueprint> {
    Ok(Json(studio.undo(&id)?))
}

async fn select(
    State(studio): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<View> {
    studio.store().select(&id, request.selection)?;
    Ok(Json(render_page(studio.store(), &id, ViewMode::Properties)?))
}

async fn viewport(
    State(studio): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<ViewportRequest>,
) -> ApiResult<UiState> {
    Ok(Json(studio.store().set_viewport(&id, request.zoom, request.pan)?))
}

async fn reset_viewport(State(studio): State<AppState>, Path(id): Path<String>) -> ApiResult<UiState> {
    Ok(Json(studio.store().reset_viewport(&id)?))
}
