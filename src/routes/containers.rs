// Container handlers

use axum::Json;
use axum::body::Body;
use axum::extract::{Path, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use crate::logs::LogOptions;
use crate::models::{Container, ContainerStats};

#[derive(Debug, Default, Deserialize)]
pub(super) struct ListQuery {
    #[serde(default)]
    all: bool,
    /// Adds health, restart count and exit code at the cost of one inspect per container.
    #[serde(default)]
    enrich: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct RemoveQuery {
    #[serde(default)]
    force: bool,
    #[serde(default)]
    volumes: bool,
}

/// GET /api/containers?all=&enrich=
pub(super) async fn list(
    State(state): State<AppState>,
    Query(q): Query<ListQuery>,
) -> Result<Json<Vec<Container>>, ApiError> {
    Ok(Json(state.docker.list_containers(q.all, q.enrich).await?))
}

/// GET /api/containers/{id}
pub(super) async fn get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Container>, ApiError> {
    state
        .docker
        .get_container(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("container", &id))
}

/// POST /api/containers/{id}/{start|stop|restart}
pub(super) async fn action(
    State(state): State<AppState>,
    Path((id, action)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    match action.as_str() {
        "start" => state.docker.start_container(&id).await?,
        "stop" => state.docker.stop_container(&id).await?,
        "restart" => state.docker.restart_container(&id).await?,
        other => {
            return Err(ApiError::bad_request(format!(
                "unknown container action {:?}",
                other
            )));
        }
    }
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/containers/{id}?force=&volumes=
pub(super) async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(q): Query<RemoveQuery>,
) -> Result<StatusCode, ApiError> {
    state.docker.remove_container(&id, q.force, q.volumes).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/containers/{id}/stats
pub(super) async fn stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContainerStats>, ApiError> {
    state
        .docker
        .container_stats(&id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("container", &id))
}

/// GET /api/containers/{id}/logs?tail=&follow=&timestamps=
///
/// Streams one text line per log line. A client disconnect drops the body and with it the
/// Engine connection.
pub(super) async fn logs(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(options): Query<LogOptions>,
) -> Result<Response, ApiError> {
    let stream = state
        .docker
        .container_logs(&id, &options)
        .await?
        .ok_or_else(|| ApiError::not_found("container", &id))?;
    let body = Body::from_stream(stream.map(|line| {
        line.map(|l| {
            let mut text = l.text;
            if !text.ends_with('\n') {
                text.push('\n');
            }
            text
        })
    }));
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        body,
    )
        .into_response())
}
