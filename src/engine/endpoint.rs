// Engine endpoint resolution

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

const DEFAULT_TCP_PORT: u16 = 2375;

/// Where the Engine API listens, resolved once from the configured string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    Unix(PathBuf),
    Http { host: String, port: u16 },
}

impl Default for Endpoint {
    fn default() -> Self {
        Endpoint::Unix(PathBuf::from("/var/run/docker.sock"))
    }
}

impl Endpoint {
    /// Accepts a bare socket path, `unix://<path>`, `tcp://host[:port]` or `http://host[:port]`.
    /// IPv6 hosts are bracketed: `tcp://[::1]:2375`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Ok(Endpoint::default());
        }
        if let Some(path) = s.strip_prefix("unix://") {
            if path.is_empty() {
                return Err(Error::invalid("unix endpoint has no socket path"));
            }
            return Ok(Endpoint::Unix(PathBuf::from(path)));
        }
        if s.starts_with('/') {
            return Ok(Endpoint::Unix(PathBuf::from(s)));
        }
        let rest = if let Some(rest) = s.strip_prefix("tcp://") {
            rest
        } else if let Some(rest) = s.strip_prefix("http://") {
            rest
        } else if s.starts_with("https://") {
            return Err(Error::invalid(format!(
                "TLS endpoints are not supported: {}",
                s
            )));
        } else {
            return Err(Error::invalid(format!("unrecognized engine endpoint: {}", s)));
        };
        let authority = rest.trim_end_matches('/');
        if authority.is_empty() || authority.contains('/') {
            return Err(Error::invalid(format!("malformed engine endpoint: {}", s)));
        }
        let (host, port) = split_host_port(authority)
            .ok_or_else(|| Error::invalid(format!("invalid port in endpoint: {}", s)))?;
        if host.is_empty() || host == "[]" {
            return Err(Error::invalid(format!("missing host in endpoint: {}", s)));
        }
        if !host.starts_with('[') && host.contains(':') {
            return Err(Error::invalid(format!(
                "IPv6 hosts must be bracketed: {}",
                s
            )));
        }
        Ok(Endpoint::Http {
            host: host.to_string(),
            port,
        })
    }

    /// Value for `DOCKER_HOST` in child processes talking to the same Engine.
    pub fn docker_host(&self) -> String {
        match self {
            Endpoint::Unix(path) => format!("unix://{}", path.display()),
            Endpoint::Http { host, port } => format!("tcp://{}:{}", host, port),
        }
    }
}

/// `host[:port]` or `[v6addr][:port]`. The brackets stay on the host so it can be pasted
/// back into a URL. `None` when the port is present but not a number.
fn split_host_port(authority: &str) -> Option<(&str, u16)> {
    let (host, port) = if authority.starts_with('[') {
        match authority.find(']') {
            Some(end) => {
                let (host, tail) = authority.split_at(end + 1);
                match tail {
                    "" => (host, None),
                    _ => (host, Some(tail.strip_prefix(':')?)),
                }
            }
            None => return None,
        }
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };
    match port {
        Some(port) => Some((host, port.parse().ok()?)),
        None => Some((host, DEFAULT_TCP_PORT)),
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Unix(path) => write!(f, "{}", path.display()),
            Endpoint::Http { host, port } => write!(f, "http://{}:{}", host, port),
        }
    }
}
