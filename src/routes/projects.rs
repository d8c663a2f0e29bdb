// Compose project handlers

use axum::Json;
use axum::body::{Body, Bytes};
use axum::extract::{Path, Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use futures_util::stream;
use serde::Deserialize;
use std::convert::Infallible;

use super::AppState;
use super::error::ApiError;
use crate::compose::{ComposeCommand, ComposeOutcome};
use crate::models::Project;

/// Optional JSON body of a project action. Fields that do not apply to the action are ignored.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ComposeOptions {
    #[serde(default)]
    build: bool,
    #[serde(default)]
    pull_always: bool,
    #[serde(default)]
    volumes: bool,
    #[serde(default)]
    remove_orphans: bool,
    #[serde(default)]
    service: Option<String>,
}

impl ComposeOptions {
    fn into_command(self, action: &str) -> Result<ComposeCommand, ApiError> {
        let command = match action {
            "up" => ComposeCommand::Up {
                build: self.build,
                pull_always: self.pull_always,
            },
            "down" => ComposeCommand::Down {
                volumes: self.volumes,
                remove_orphans: self.remove_orphans,
            },
            "pull" => ComposeCommand::Pull {
                service: self.service,
            },
            "restart" => ComposeCommand::Restart {
                service: self.service,
            },
            "stop" => ComposeCommand::Stop {
                service: self.service,
            },
            other => {
                return Err(ApiError::bad_request(format!(
                    "unknown project action {:?}",
                    other
                )));
            }
        };
        Ok(command)
    }
}

#[derive(Debug, Default, Deserialize)]
pub(super) struct LogsQuery {
    #[serde(default)]
    follow: bool,
    #[serde(default)]
    tail: Option<u64>,
    #[serde(default)]
    service: Option<String>,
}

/// GET /api/projects
pub(super) async fn list(State(state): State<AppState>) -> Result<Json<Vec<Project>>, ApiError> {
    Ok(Json(state.projects.scan_projects().await?))
}

/// GET /api/projects/{name}
pub(super) async fn get(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Project>, ApiError> {
    state
        .projects
        .get_project(&name)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("project", &name))
}

/// POST /api/projects/{name}/{up|down|pull|restart|stop}
///
/// Runs the compose command to completion. A non-zero exit is still a 200 with
/// `success: false` and the captured output.
pub(super) async fn action(
    State(state): State<AppState>,
    Path((name, action)): Path<(String, String)>,
    body: Bytes,
) -> Result<Json<ComposeOutcome>, ApiError> {
    let options: ComposeOptions = if body.iter().all(u8::is_ascii_whitespace) {
        ComposeOptions::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| ApiError::bad_request(format!("invalid request body: {}", e)))?
    };
    let command = options.into_command(&action)?;
    state
        .projects
        .run(&name, &command)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("project", &name))
}

/// GET /api/projects/{name}/logs?follow=&tail=&service=
///
/// Streams `compose logs` output. Dropping the response kills the process.
pub(super) async fn logs(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(q): Query<LogsQuery>,
) -> Result<Response, ApiError> {
    let command = ComposeCommand::Logs {
        follow: q.follow,
        tail: q.tail,
        service: q.service,
    };
    let run = state
        .projects
        .spawn(&name, &command)
        .await?
        .ok_or_else(|| ApiError::not_found("project", &name))?
        .without_capture();
    let lines = stream::unfold(run, |mut run| async move {
        let line = run.next_line().await?;
        let mut text = line.text;
        text.push('\n');
        Some((Ok::<_, Infallible>(text), run))
    });
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        Body::from_stream(lines),
    )
        .into_response())
}
