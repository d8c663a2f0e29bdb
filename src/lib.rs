// Library for tests to access modules

pub mod compose;
pub mod config;
pub mod docker_repo;
pub mod engine;
pub mod error;
pub mod logs;
pub mod models;
pub mod normalize;
pub mod project_repo;
pub mod routes;
pub mod stats;
pub mod version;
