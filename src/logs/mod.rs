// Container log lines as a cancellable, pull-based stream.

pub mod demux;

use bollard::container::LogOutput;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio_util::sync::CancellationToken;

use crate::engine::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStreamKind {
    Stdin,
    Stdout,
    Stderr,
    /// TTY output; stdout and stderr are not distinguished.
    Console,
}

/// One write by the container, decoded as UTF-8 (lossy).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub stream: LogStreamKind,
    pub text: String,
}

impl LogLine {
    pub fn from_bytes(stream: LogStreamKind, bytes: &[u8]) -> Self {
        Self {
            stream,
            text: String::from_utf8_lossy(bytes).into_owned(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogOptions {
    #[serde(default)]
    pub follow: bool,
    /// Last N lines; all lines when unset.
    #[serde(default)]
    pub tail: Option<u64>,
    #[serde(default)]
    pub timestamps: bool,
}

/// Lines from one container. The underlying connection is dropped exactly once: when the
/// source ends, when `cancel` is called (here or through a cloned token), or when the
/// stream itself is dropped.
pub struct LogStream {
    inner: Option<BoxStream<'static, Result<LogLine, EngineError>>>,
    cancel: CancellationToken,
}

impl LogStream {
    pub fn new<S>(source: S) -> Self
    where
        S: Stream<Item = Result<LogLine, EngineError>> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let inner = source.take_until(cancel.clone().cancelled_owned()).boxed();
        Self {
            inner: Some(inner),
            cancel,
        }
    }

    /// Wraps client log output, already split into stdout/stderr/console chunks.
    pub fn from_output(source: BoxStream<'static, Result<LogOutput, EngineError>>) -> Self {
        Self::new(demux::split_output(source))
    }

    /// Token that stops this stream from another task (e.g. when an HTTP client goes away).
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn cancel(&mut self) {
        self.cancel.cancel();
        self.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.is_none()
    }

    fn close(&mut self) {
        if self.inner.take().is_some() {
            tracing::debug!("log stream closed");
        }
    }
}

impl Stream for LogStream {
    type Item = Result<LogLine, EngineError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let Some(inner) = this.inner.as_mut() else {
            return Poll::Ready(None);
        };
        match inner.poll_next_unpin(cx) {
            Poll::Ready(None) => {
                this.close();
                Poll::Ready(None)
            }
            other => other,
        }
    }
}
