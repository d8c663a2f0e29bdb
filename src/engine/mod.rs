// Engine client adapter: one shared bollard connection plus a long-timeout twin for slow calls.

mod endpoint;
pub mod raw;
mod stats;

pub use endpoint::Endpoint;

use bollard::query_parameters::{
    InspectContainerOptions, InspectNetworkOptions, ListContainersOptions, ListImagesOptions,
    ListNetworksOptions, ListVolumesOptions, LogsOptions, PruneBuildOptions,
    PruneContainersOptions, PruneImagesOptions, PruneNetworksOptions, PruneVolumesOptions,
    RemoveContainerOptions, RemoveImageOptions, RemoveVolumeOptions, RestartContainerOptions,
    StartContainerOptions, StatsOptions, StopContainerOptions,
};
use bollard::{API_DEFAULT_VERSION, Docker};
use futures_util::{StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

use crate::logs::{LogOptions, LogStream};
use crate::stats::StatsSnapshot;
use raw::{
    RawContainer, RawContainerDetail, RawDiskUsage, RawImage, RawImageDetail, RawNetwork,
    RawPruneResponse, RawVersion, RawVolume, RawVolumeList, decode,
};

/// Seconds the Engine waits for a graceful stop before killing.
const STOP_TIMEOUT_SECS: i32 = 10;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Connection refused, socket missing, or the call timed out.
    #[error("engine unreachable: {message}")]
    Unreachable { message: String },

    /// The Engine answered with an error.
    #[error("engine error{}: {message}", fmt_status(.status))]
    Api { status: Option<u16>, message: String },

    #[error("unexpected engine payload: {0}")]
    Schema(#[source] serde_json::Error),

    #[error("malformed log stream: {0}")]
    Stream(#[from] std::io::Error),
}

impl EngineError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, EngineError::Api { status: Some(404), .. })
    }

    pub fn is_unreachable(&self) -> bool {
        matches!(self, EngineError::Unreachable { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            EngineError::Api { status, .. } => *status,
            _ => None,
        }
    }
}

fn fmt_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" ({})", s)).unwrap_or_default()
}

fn has_io_cause(e: &(dyn std::error::Error + 'static)) -> bool {
    let mut cause = e.source();
    while let Some(c) = cause {
        if c.is::<std::io::Error>() {
            return true;
        }
        cause = c.source();
    }
    false
}

impl From<bollard::errors::Error> for EngineError {
    fn from(e: bollard::errors::Error) -> Self {
        use bollard::errors::Error as B;
        match e {
            B::DockerResponseServerError {
                status_code,
                message,
            } => EngineError::Api {
                status: Some(status_code),
                message,
            },
            B::RequestTimeoutError | B::IOError { .. } => {
                EngineError::Unreachable {
                    message: e.to_string(),
                }
            }
            other if has_io_cause(&other) => EngineError::Unreachable {
                message: other.to_string(),
            },
            other => EngineError::Api {
                status: None,
                message: other.to_string(),
            },
        }
    }
}

/// `Ok(None)` for a 404, everything else passes through.
pub fn found<T>(r: Result<T, EngineError>) -> Result<Option<T>, EngineError> {
    match r {
        Ok(v) => Ok(Some(v)),
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Handle to the Engine API. Cheap to clone; every call is an independent request.
#[derive(Clone)]
pub struct EngineClient {
    docker: Docker,
    /// Same endpoint, longer timeout; used for prune and build-cache cleanup.
    slow: Docker,
    endpoint: Endpoint,
}

impl EngineClient {
    /// Builds the clients; no request is made until the first call.
    pub fn connect(
        endpoint: &Endpoint,
        timeout: Duration,
        long_timeout: Duration,
    ) -> Result<Self, EngineError> {
        let docker = Self::client(endpoint, timeout)?;
        let slow = Self::client(endpoint, long_timeout)?;
        debug!(%endpoint, timeout_secs = timeout.as_secs(), "engine client configured");
        Ok(Self {
            docker,
            slow,
            endpoint: endpoint.clone(),
        })
    }

    fn client(endpoint: &Endpoint, timeout: Duration) -> Result<Docker, EngineError> {
        let secs = timeout.as_secs().max(1);
        let docker = match endpoint {
            Endpoint::Unix(path) => {
                Docker::connect_with_unix(&path.to_string_lossy(), secs, API_DEFAULT_VERSION)?
            }
            Endpoint::Http { host, port } => Docker::connect_with_http(
                &format!("http://{}:{}", host, port),
                secs,
                API_DEFAULT_VERSION,
            )?,
        };
        Ok(docker)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    // --- system ---

    pub async fn ping(&self) -> Result<(), EngineError> {
        self.docker.ping().await?;
        Ok(())
    }

    pub async fn version(&self) -> Result<RawVersion, EngineError> {
        decode(&self.docker.version().await?)
    }

    pub async fn disk_usage(&self) -> Result<RawDiskUsage, EngineError> {
        decode(&self.slow.df(None::<bollard::query_parameters::DataUsageOptions>).await?)
    }

    // --- containers ---

    pub async fn list_containers(&self, all: bool) -> Result<Vec<RawContainer>, EngineError> {
        self.list_containers_filtered(all, HashMap::new()).await
    }

    /// `filters` uses the Engine's filter syntax, e.g. `label` -> `["com.docker.compose.project"]`.
    pub async fn list_containers_filtered(
        &self,
        all: bool,
        filters: HashMap<String, Vec<String>>,
    ) -> Result<Vec<RawContainer>, EngineError> {
        let options = ListContainersOptions {
            all,
            filters: (!filters.is_empty()).then_some(filters),
            ..Default::default()
        };
        let containers = self.docker.list_containers(Some(options)).await?;
        containers.iter().map(decode).collect()
    }

    pub async fn inspect_container(&self, id: &str) -> Result<RawContainerDetail, EngineError> {
        decode(
            &self
                .docker
                .inspect_container(id, None::<InspectContainerOptions>)
                .await?,
        )
    }

    pub async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        self.docker
            .start_container(id, None::<StartContainerOptions>)
            .await?;
        Ok(())
    }

    pub async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        let options = StopContainerOptions {
            t: Some(STOP_TIMEOUT_SECS),
            ..Default::default()
        };
        self.docker.stop_container(id, Some(options)).await?;
        Ok(())
    }

    pub async fn restart_container(&self, id: &str) -> Result<(), EngineError> {
        let options = RestartContainerOptions {
            t: Some(STOP_TIMEOUT_SECS),
            ..Default::default()
        };
        self.docker.restart_container(id, Some(options)).await?;
        Ok(())
    }

    pub async fn remove_container(
        &self,
        id: &str,
        force: bool,
        volumes: bool,
    ) -> Result<(), EngineError> {
        let options = RemoveContainerOptions {
            force,
            v: volumes,
            ..Default::default()
        };
        self.docker.remove_container(id, Some(options)).await?;
        Ok(())
    }

    /// One-shot stats sample; the Engine fills the previous CPU reading itself.
    pub async fn stats(&self, id: &str) -> Result<StatsSnapshot, EngineError> {
        let options = StatsOptions {
            stream: false,
            ..Default::default()
        };
        let mut stream = self.docker.stats(id, Some(options));
        match stream.next().await {
            Some(Ok(s)) => Ok(stats::snapshot_from_response(&s)),
            Some(Err(e)) => Err(e.into()),
            None => Err(EngineError::Api {
                status: None,
                message: format!("stats stream for {} ended without a sample", id),
            }),
        }
    }

    /// Log stream for one container.
    pub fn logs(&self, id: &str, options: &LogOptions) -> LogStream {
        let query = LogsOptions {
            follow: options.follow,
            stdout: true,
            stderr: true,
            timestamps: options.timestamps,
            tail: options
                .tail
                .map(|n| n.to_string())
                .unwrap_or_else(|| "all".to_string()),
            ..Default::default()
        };
        let source = self
            .docker
            .logs(id, Some(query))
            .map_err(EngineError::from)
            .boxed();
        LogStream::from_output(source)
    }

    pub async fn prune_containers(&self) -> Result<RawPruneResponse, EngineError> {
        decode(
            &self
                .docker
                .prune_containers(None::<PruneContainersOptions>)
                .await?,
        )
    }

    // --- images ---

    pub async fn list_images(&self) -> Result<Vec<RawImage>, EngineError> {
        let options = ListImagesOptions {
            all: false,
            ..Default::default()
        };
        let images = self.docker.list_images(Some(options)).await?;
        images.iter().map(decode).collect()
    }

    pub async fn inspect_image(&self, name: &str) -> Result<RawImageDetail, EngineError> {
        decode(&self.docker.inspect_image(name).await?)
    }

    pub async fn remove_image(&self, name: &str, force: bool) -> Result<Vec<String>, EngineError> {
        let options = RemoveImageOptions {
            force,
            ..Default::default()
        };
        let items = self.docker.remove_image(name, Some(options), None).await?;
        let items: Vec<raw::RawImageDeleted> = items.iter().map(decode).collect::<Result<_, _>>()?;
        Ok(items
            .into_iter()
            .filter_map(|i| i.deleted.or(i.untagged))
            .collect())
    }

    pub async fn prune_images(&self, dangling_only: bool) -> Result<RawPruneResponse, EngineError> {
        let mut filters = HashMap::new();
        filters.insert(
            "dangling".to_string(),
            vec![dangling_only.to_string()],
        );
        let options = PruneImagesOptions {
            filters: Some(filters),
            ..Default::default()
        };
        decode(&self.slow.prune_images(Some(options)).await?)
    }

    pub async fn prune_build_cache(&self) -> Result<RawPruneResponse, EngineError> {
        decode(&self.slow.prune_build(None::<PruneBuildOptions>).await?)
    }

    // --- networks ---

    pub async fn list_networks(&self) -> Result<Vec<RawNetwork>, EngineError> {
        let networks = self
            .docker
            .list_networks(None::<ListNetworksOptions>)
            .await?;
        networks.iter().map(decode).collect()
    }

    pub async fn inspect_network(&self, id: &str) -> Result<RawNetwork, EngineError> {
        decode(
            &self
                .docker
                .inspect_network(id, None::<InspectNetworkOptions>)
                .await?,
        )
    }

    pub async fn remove_network(&self, id: &str) -> Result<(), EngineError> {
        self.docker.remove_network(id).await?;
        Ok(())
    }

    pub async fn prune_networks(&self) -> Result<RawPruneResponse, EngineError> {
        decode(
            &self
                .docker
                .prune_networks(None::<PruneNetworksOptions>)
                .await?,
        )
    }

    // --- volumes ---

    pub async fn list_volumes(&self) -> Result<Vec<RawVolume>, EngineError> {
        let list: RawVolumeList = decode(
            &self
                .docker
                .list_volumes(None::<ListVolumesOptions>)
                .await?,
        )?;
        Ok(list.volumes.unwrap_or_default())
    }

    pub async fn inspect_volume(&self, name: &str) -> Result<RawVolume, EngineError> {
        decode(&self.docker.inspect_volume(name).await?)
    }

    pub async fn remove_volume(&self, name: &str, force: bool) -> Result<(), EngineError> {
        let options = RemoveVolumeOptions {
            force,
            ..Default::default()
        };
        self.docker.remove_volume(name, Some(options)).await?;
        Ok(())
    }

    pub async fn prune_volumes(&self) -> Result<RawPruneResponse, EngineError> {
        decode(
            &self
                .slow
                .prune_volumes(None::<PruneVolumesOptions>)
                .await?,
        )
    }
}
