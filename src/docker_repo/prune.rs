// Prune targets

use std::fmt;
use std::str::FromStr;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PruneTarget {
    Containers,
    Images { dangling_only: bool },
    Networks,
    Volumes,
    BuildCache,
    /// Stopped containers, unused networks, dangling images and build cache. Never volumes.
    System,
}

impl FromStr for PruneTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "containers" => Ok(PruneTarget::Containers),
            "images" => Ok(PruneTarget::Images {
                dangling_only: true,
            }),
            "images-all" => Ok(PruneTarget::Images {
                dangling_only: false,
            }),
            "networks" => Ok(PruneTarget::Networks),
            "volumes" => Ok(PruneTarget::Volumes),
            "build-cache" => Ok(PruneTarget::BuildCache),
            "system" => Ok(PruneTarget::System),
            other => Err(Error::invalid(format!("unknown prune target {:?}", other))),
        }
    }
}

impl fmt::Display for PruneTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PruneTarget::Containers => "containers",
            PruneTarget::Images {
                dangling_only: true,
            } => "images",
            PruneTarget::Images {
                dangling_only: false,
            } => "images-all",
            PruneTarget::Networks => "networks",
            PruneTarget::Volumes => "volumes",
            PruneTarget::BuildCache => "build-cache",
            PruneTarget::System => "system",
        };
        f.write_str(s)
    }
}
