// Image, network and volume handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use crate::models::{Image, Network, Volume};

#[derive(Debug, Default, Deserialize)]
pub(super) struct ForceQuery {
    #[serde(default)]
    force: bool,
}

/// GET /api/images
pub(super) async fn list_images(
    State(state): State<AppState>,
) -> Result<Json<Vec<Image>>, ApiError> {
    Ok(Json(state.docker.list_images().await?))
}

/// GET /api/images/{id}
pub(super) async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Image>, ApiError> {
    state
        .docker
        .get_image(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("image", &id))
}

/// DELETE /api/images/{id}?force=
pub(super) async fn remove_image(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<ForceQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    Ok(Json(state.docker.remove_image(&id, q.force).await?))
}

/// GET /api/networks
pub(super) async fn list_networks(
    State(state): State<AppState>,
) -> Result<Json<Vec<Network>>, ApiError> {
    Ok(Json(state.docker.list_networks().await?))
}

/// GET /api/networks/{id}
pub(super) async fn get_network(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Network>, ApiError> {
    state
        .docker
        .get_network(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("network", &id))
}

/// DELETE /api/networks/{id}
pub(super) async fn remove_network(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.docker.remove_network(&id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/volumes
pub(super) async fn list_volumes(
    State(state): State<AppState>,
) -> Result<Json<Vec<Volume>>, ApiError> {
    Ok(Json(state.docker.list_volumes().await?))
}

/// GET /api/volumes/{name}
pub(super) async fn get_volume(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Volume>, ApiError> {
    state
        .docker
        .get_volume(&name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("volume", &name))
}

/// DELETE /api/volumes/{name}?force=
pub(super) async fn remove_volume(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<ForceQuery>,
) -> Result<StatusCode, ApiError> {
    state.docker.remove_volume(&name, q.force).await?;
    Ok(StatusCode::NO_CONTENT)
}
