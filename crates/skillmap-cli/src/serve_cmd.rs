use std::net::SocketAddr;

use anyhow::Result;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{error, info, warn};
use uuid::Uuid;

use skillmap_core::adjust::{ContextChange, DayProgress, NodeProgress};
use skillmap_core::generator::GenerationRequest;
use skillmap_core::{SkillMapError, SkillMapService};
use skillmap_db::models::{SkillMap, SkillProgram};

use crate::config::ServerSettings;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl From<SkillMapError> for AppError {
    fn from(err: SkillMapError) -> Self {
        let status = match &err {
            SkillMapError::MalformedPlan { .. }
            | SkillMapError::InvalidTreeStructure(_)
            | SkillMapError::InvalidSchedule(_)
            | SkillMapError::Generator(_) => StatusCode::BAD_GATEWAY,
            SkillMapError::InvalidProgressValue { .. }
            | SkillMapError::InvalidImpactFactor { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            SkillMapError::PlanNotFound(_) => StatusCode::NOT_FOUND,
            SkillMapError::ConcurrentUpdate { .. } => StatusCode::CONFLICT,
            SkillMapError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(error = %err, "request failed");
        } else {
            warn!(error = %err, "request rejected");
        }
        Self {
            status,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct SkillMapResponse {
    pub skill_map: SkillMap,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SkillProgramResponse {
    pub skill_program: SkillProgram,
    pub user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProgressUpdateRequest {
    /// Echoed back; not checked against the plan's owner.
    pub user_id: String,
    pub skill_map_id: Uuid,
    pub progress_data: Vec<NodeProgress>,
    #[serde(default)]
    pub context_changes: Option<Vec<ContextChange>>,
}

#[derive(Debug, Serialize)]
pub struct ProgressUpdateResponse {
    pub updated_skill_map: SkillMap,
    pub user_id: String,
    pub skill_map_id: Uuid,
    pub adjustment_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProgramProgressRequest {
    pub user_id: String,
    pub program_id: Uuid,
    pub progress_data: Vec<DayProgress>,
    #[serde(default)]
    pub context_changes: Option<Vec<ContextChange>>,
}

#[derive(Debug, Serialize)]
pub struct ProgramProgressResponse {
    pub updated_skill_program: SkillProgram,
    pub user_id: String,
    pub program_id: Uuid,
    pub adjustment_summary: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub user_id: Option<String>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

pub fn build_router(service: SkillMapService, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/generate_skill_map", post(generate_skill_map))
        .route("/api/generate_skill_program", post(generate_skill_program))
        .route("/api/update_progress", post(update_progress))
        .route("/api/update_program_progress", post(update_program_progress))
        .route("/api/skill_maps", get(list_skill_maps))
        .route(
            "/api/skill_maps/{id}",
            get(get_skill_map).delete(delete_skill_map),
        )
        .route("/api/skill_programs", get(list_skill_programs))
        .route(
            "/api/skill_programs/{id}",
            get(get_skill_program).delete(delete_skill_program),
        )
        .layer(cors_layer(cors_origins))
        .with_state(service)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(service: SkillMapService, settings: &ServerSettings) -> Result<()> {
    let app = build_router(service, &settings.cors_origins);
    let addr: SocketAddr = format!("{}:{}", settings.bind, settings.port).parse()?;
    info!("skillmap serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("skillmap serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}

async fn generate_skill_map(
    State(service): State<SkillMapService>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<SkillMapResponse>, AppError> {
    let skill_map = service.generate_skill_map(&request).await?;
    Ok(Json(SkillMapResponse {
        user_id: request.user_id().map(str::to_string),
        skill_map,
    }))
}

async fn generate_skill_program(
    State(service): State<SkillMapService>,
    Json(request): Json<GenerationRequest>,
) -> Result<Json<SkillProgramResponse>, AppError> {
    let skill_program = service.generate_skill_program(&request).await?;
    Ok(Json(SkillProgramResponse {
        user_id: request.user_id().map(str::to_string),
        skill_program,
    }))
}

async fn update_progress(
    State(service): State<SkillMapService>,
    Json(request): Json<ProgressUpdateRequest>,
) -> Result<Json<ProgressUpdateResponse>, AppError> {
    let changes = request.context_changes.unwrap_or_default();
    let outcome = service
        .update_progress(request.skill_map_id, &request.progress_data, &changes)
        .await?;
    let adjustment_summary = outcome.summary();
    Ok(Json(ProgressUpdateResponse {
        updated_skill_map: outcome.plan,
        user_id: request.user_id,
        skill_map_id: request.skill_map_id,
        adjustment_summary,
    }))
}

async fn update_program_progress(
    State(service): State<SkillMapService>,
    Json(request): Json<ProgramProgressRequest>,
) -> Result<Json<ProgramProgressResponse>, AppError> {
    let changes = request.context_changes.unwrap_or_default();
    let outcome = service
        .update_program_progress(request.program_id, &request.progress_data, &changes)
        .await?;
    let adjustment_summary = outcome.summary();
    Ok(Json(ProgramProgressResponse {
        updated_skill_program: outcome.plan,
        user_id: request.user_id,
        program_id: request.program_id,
        adjustment_summary,
    }))
}

async fn list_skill_maps(
    State(service): State<SkillMapService>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SkillMap>>, AppError> {
    Ok(Json(service.list_skill_maps(query.user_id.as_deref()).await?))
}

async fn get_skill_map(
    State(service): State<SkillMapService>,
    Path(id): Path<Uuid>,
) -> Result<Json<SkillMap>, AppError> {
    Ok(Json(service.get_skill_map(id).await?))
}

async fn delete_skill_map(
    State(service): State<SkillMapService>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.delete_skill_map(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_skill_programs(
    State(service): State<SkillMapService>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<SkillProgram>>, AppError> {
    Ok(Json(service.list_skill_programs(query.user_id.as_deref()).await?))
}

async fn get_skill_program(
    State(service): State<SkillMapService>,
    Path(id): Path<Uuid>,
) -> Result<Json<SkillProgram>, AppError> {
    Ok(Json(service.get_skill_program(id).await?))
}

async fn delete_skill_program(
    State(service): State<SkillMapService>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    service.delete_skill_program(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
