use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::Endpoint;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    #[serde(default)]
    pub engine: EngineConfig,
    pub projects: ProjectsConfig,
    #[serde(default)]
    pub compose: ComposeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Unix socket path (`/var/run/docker.sock`, `unix:///...`) or `tcp://` / `http://` URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Timeout for the client used by system prune and build-cache cleanup.
    #[serde(default = "default_long_timeout_secs")]
    pub long_timeout_secs: u64,
    /// Max simultaneous inspect calls when enriching container lists.
    #[serde(default = "default_enrich_concurrency")]
    pub enrich_concurrency: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            timeout_secs: default_timeout_secs(),
            long_timeout_secs: default_long_timeout_secs(),
            enrich_concurrency: default_enrich_concurrency(),
        }
    }
}

fn default_endpoint() -> String {
    "/var/run/docker.sock".into()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_long_timeout_secs() -> u64 {
    300
}

fn default_enrich_concurrency() -> usize {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProjectsConfig {
    pub root: PathBuf,
    /// The Docker host's view of `root`. Unset means both sides see the same paths.
    #[serde(default)]
    pub host_root: Option<PathBuf>,
    #[serde(default = "default_scan_cache_ttl_ms")]
    pub scan_cache_ttl_ms: u64,
}

fn default_scan_cache_ttl_ms() -> u64 {
    2000
}

impl ProjectsConfig {
    pub fn host_root(&self) -> &Path {
        self.host_root.as_deref().unwrap_or(&self.root)
    }

    pub fn scan_cache_ttl(&self) -> Duration {
        Duration::from_millis(self.scan_cache_ttl_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComposeConfig {
    #[serde(default = "default_binary")]
    pub binary: String,
    /// Extra variable names passed through to compose child processes.
    #[serde(default)]
    pub extra_env: Vec<String>,
}

impl Default for ComposeConfig {
    fn default() -> Self {
        Self {
            binary: default_binary(),
            extra_env: Vec::new(),
        }
    }
}

fn default_binary() -> String {
    "docker".into()
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config.toml".into());
        let s = std::fs::read_to_string(&path)?;
        Self::load_from_str(&s)
    }

    /// Parse and validate config from a string (e.g. for tests).
    pub fn load_from_str(s: &str) -> anyhow::Result<Self> {
        let config: AppConfig = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Parsed engine endpoint; `validate` has already checked it parses.
    pub fn endpoint(&self) -> anyhow::Result<Endpoint> {
        Ok(Endpoint::parse(&self.engine.endpoint)?)
    }

    fn validate(&self) -> anyhow::Result<()> {
        anyhow::ensure!(
            self.server.port > 0,
            "server.port must be between 1 and 65535, got {}",
            self.server.port
        );
        if let Err(e) = Endpoint::parse(&self.engine.endpoint) {
            anyhow::bail!("engine.endpoint is invalid: {}", e);
        }
        anyhow::ensure!(
            self.engine.timeout_secs > 0,
            "engine.timeout_secs must be > 0, got {}",
            self.engine.timeout_secs
        );
        anyhow::ensure!(
            self.engine.long_timeout_secs >= self.engine.timeout_secs,
            "engine.long_timeout_secs must be >= engine.timeout_secs, got {}",
            self.engine.long_timeout_secs
        );
        anyhow::ensure!(
            self.engine.enrich_concurrency > 0,
            "engine.enrich_concurrency must be > 0, got {}",
            self.engine.enrich_concurrency
        );
        anyhow::ensure!(
            self.projects.root.is_absolute(),
            "projects.root must be an absolute path, got {}",
            self.projects.root.display()
        );
        if let Some(host_root) = &self.projects.host_root {
            anyhow::ensure!(
                host_root.is_absolute(),
                "projects.host_root must be an absolute path, got {}",
                host_root.display()
            );
        }
        anyhow::ensure!(
            !self.compose.binary.is_empty(),
            "compose.binary must be non-empty"
        );
        Ok(())
    }
}
