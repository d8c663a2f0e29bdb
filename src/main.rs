use anyhow::Result;
use dockhand::*;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let app_config = config::AppConfig::load()?;
    let endpoint = app_config.endpoint()?;
    let engine = engine::EngineClient::connect(
        &endpoint,
        Duration::from_secs(app_config.engine.timeout_secs),
        Duration::from_secs(app_config.engine.long_timeout_secs),
    )?;
    // not fatal: the API reports 503 until the engine comes up
    if let Err(e) = engine.ping().await {
        tracing::warn!(%endpoint, error = %e, "engine not reachable at startup");
    }
    let docker_repo = docker_repo::DockerRepo::new(engine, app_config.engine.enrich_concurrency);

    let translator = compose::PathTranslator::new(
        &app_config.projects.root,
        app_config.projects.host_root(),
    );
    if !translator.is_identity() {
        tracing::info!(
            local = %translator.local_root().display(),
            host = %translator.host_root().display(),
            "translating compose paths for the engine host"
        );
    }
    let runner = compose::ComposeRunner::new(
        app_config.compose.binary.clone(),
        app_config.compose.extra_env.clone(),
        translator,
        &endpoint,
    );
    let project_repo = Arc::new(project_repo::ProjectRepo::new(
        app_config.projects.root.clone(),
        docker_repo.clone(),
        runner,
        app_config.projects.scan_cache_ttl(),
    ));

    let app = routes::app(docker_repo, project_repo);
    let addr = format!("{}:{}", app_config.server.host, app_config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on http://{}", addr);

    tokio::select! {
        result = axum::serve(listener, app) => {
            result?;
        }
        _ = async {
            #[cfg(unix)]
            {
                let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                    Ok(s) => s,
                    Err(_) => {
                        let _ = tokio::signal::ctrl_c().await;
                        return;
                    }
                };
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            #[cfg(not(unix))]
            {
                let _ = tokio::signal::ctrl_c().await;
            }
        } => {
            tracing::info!("Received shutdown signal");
        }
    }

    Ok(())
}
