// Crate-wide error type

use std::path::PathBuf;
use std::sync::Arc;

use crate::engine::EngineError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// Rejected before any I/O was attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to parse compose manifest {path}: {source}")]
    Manifest {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// Failure of a de-duplicated operation whose result several callers awaited.
    #[error(transparent)]
    Shared(Arc<Error>),
}

impl Error {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Error::InvalidInput(msg.into())
    }

    /// The underlying engine error, looking through shared wrappers.
    pub fn engine(&self) -> Option<&EngineError> {
        match self {
            Error::Engine(e) => Some(e),
            Error::Shared(inner) => inner.engine(),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.engine().is_some_and(EngineError::is_not_found)
    }
}

impl From<Arc<Error>> for Error {
    fn from(e: Arc<Error>) -> Self {
        Error::Shared(e)
    }
}
