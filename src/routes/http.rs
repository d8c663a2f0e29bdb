// GET handlers: version, engine info, disk usage; system prune

use axum::Json;
use axum::extract::{Path, State};
use axum::response::IntoResponse;

use super::AppState;
use super::error::ApiError;
use crate::docker_repo::PruneTarget;
use crate::models::{DiskUsage, EngineInfo, PruneReport};
use crate::version::{NAME, VERSION};

/// GET /version: service name and version (from Cargo.toml at build time).
pub(super) async fn version_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "name": NAME,
        "version": VERSION,
    }))
}

/// GET /api/engine
pub(super) async fn engine_handler(
    State(state): State<AppState>,
) -> Result<Json<EngineInfo>, ApiError> {
    Ok(Json(state.docker.engine_info().await?))
}

/// GET /api/system/df
pub(super) async fn disk_usage_handler(
    State(state): State<AppState>,
) -> Result<Json<DiskUsage>, ApiError> {
    Ok(Json(state.docker.disk_usage().await?))
}

/// POST /api/system/prune/{target}
pub(super) async fn prune_handler(
    State(state): State<AppState>,
    Path(target): Path<String>,
) -> Result<Json<PruneReport>, ApiError> {
    let target: PruneTarget = target.parse()?;
    Ok(Json(state.docker.prune(target).await?))
}
