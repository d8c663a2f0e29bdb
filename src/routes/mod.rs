// HTTP routes

mod containers;
mod error;
mod http;
mod projects;
mod resources;

use axum::{
    Router,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::docker_repo::DockerRepo;
use crate::project_repo::ProjectRepo;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) docker: DockerRepo,
    pub(crate) projects: Arc<ProjectRepo>,
}

pub fn app(docker: DockerRepo, projects: Arc<ProjectRepo>) -> Router {
    let state = AppState { docker, projects };
    Router::new()
        .route("/version", get(http::version_handler)) // GET /version
        .route("/api/engine", get(http::engine_handler))
        .route("/api/system/df", get(http::disk_usage_handler))
        .route("/api/system/prune/{target}", post(http::prune_handler))
        .route("/api/containers", get(containers::list))
        .route(
            "/api/containers/{id}",
            get(containers::get).delete(containers::remove),
        )
        .route("/api/containers/{id}/stats", get(containers::stats))
        .route("/api/containers/{id}/logs", get(containers::logs))
        .route("/api/containers/{id}/{action}", post(containers::action))
        .route("/api/images", get(resources::list_images))
        .route(
            "/api/images/{id}",
            get(resources::get_image).delete(resources::remove_image),
        )
        .route("/api/networks", get(resources::list_networks))
        .route(
            "/api/networks/{id}",
            get(resources::get_network).delete(resources::remove_network),
        )
        .route("/api/volumes", get(resources::list_volumes))
        .route(
            "/api/volumes/{name}",
            get(resources::get_volume).delete(resources::remove_volume),
        )
        .route("/api/projects", get(projects::list))
        .route("/api/projects/{name}", get(projects::get))
        .route("/api/projects/{name}/logs", get(projects::logs))
        .route("/api/projects/{name}/{action}", post(projects::action))
        .layer(CorsLayer::new().allow_origin(Any))
        .with_state(state)
}
