// Engine multiplexed log framing:
// [1 byte stream type][3 reserved][4 byte big-endian payload length][payload]

use bollard::container::LogOutput;
use bytes::{Buf, Bytes, BytesMut};
use futures_util::stream::{self, Stream, StreamExt};
use tokio_util::codec::Decoder;

use super::{LogLine, LogStreamKind};

pub const HEADER_LEN: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogFrame {
    pub stream: LogStreamKind,
    pub payload: Bytes,
}

impl LogFrame {
    pub fn into_line(self) -> LogLine {
        LogLine {
            stream: self.stream,
            text: String::from_utf8_lossy(&self.payload).into_owned(),
        }
    }
}

fn stream_kind(byte: u8) -> LogStreamKind {
    match byte {
        0 => LogStreamKind::Stdin,
        1 => LogStreamKind::Stdout,
        2 => LogStreamKind::Stderr,
        _ => LogStreamKind::Console,
    }
}

/// Splits a buffered byte sequence into frames; waits for more input on partial frames.
#[derive(Debug, Default)]
pub struct FrameDecoder;

impl Decoder for FrameDecoder {
    type Item = LogFrame;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<LogFrame>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }
        let len = u32::from_be_bytes([src[4], src[5], src[6], src[7]]) as usize;
        let frame_len = HEADER_LEN + len;
        if src.len() < frame_len {
            src.reserve(frame_len - src.len());
            return Ok(None);
        }
        let stream = stream_kind(src[0]);
        src.advance(HEADER_LEN);
        let payload = src.split_to(len).freeze();
        Ok(Some(LogFrame { stream, payload }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<LogFrame>, Self::Error> {
        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None => {
                if !src.is_empty() {
                    tracing::debug!(
                        remaining = src.len(),
                        "dropping truncated log frame at end of stream"
                    );
                    src.clear();
                }
                Ok(None)
            }
        }
    }
}

/// Accumulation buffer plus decoder; feed chunks in, take whole frames out.
#[derive(Debug, Default)]
pub struct Demuxer {
    buf: BytesMut,
    decoder: FrameDecoder,
}

impl Demuxer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    pub fn next_frame(&mut self) -> std::io::Result<Option<LogFrame>> {
        self.decoder.decode(&mut self.buf)
    }

    /// Final frame at end of input; a trailing partial frame is discarded.
    pub fn finish(&mut self) -> std::io::Result<Option<LogFrame>> {
        self.decoder.decode_eof(&mut self.buf)
    }

    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

fn output_line(output: LogOutput) -> Option<LogLine> {
    let (stream, message) = match output {
        LogOutput::StdOut { message } => (LogStreamKind::Stdout, message),
        LogOutput::StdErr { message } => (LogStreamKind::Stderr, message),
        LogOutput::StdIn { .. } => return None,
        // TTY output, or bytes the client could not read as a frame header: plain text
        LogOutput::Console { message } => (LogStreamKind::Console, message),
    };
    Some(LogLine::from_bytes(stream, &message))
}

/// Turns client log output into lines. The client has already split frames; console chunks
/// are passed through as text.
pub fn split_output<S, E>(source: S) -> impl Stream<Item = Result<LogLine, E>> + Send
where
    S: Stream<Item = Result<LogOutput, E>> + Send + 'static,
    E: Send + 'static,
{
    source.filter_map(|r| async move {
        match r {
            Ok(output) => output_line(output).map(Ok),
            Err(e) => Some(Err(e)),
        }
    })
}

struct DemuxState<S> {
    chunks: S,
    demuxer: Demuxer,
    done: bool,
}

/// Decodes a raw framed byte stream (e.g. a hijacked connection body) into lines.
pub fn demultiplex_bytes<S, E>(chunks: S) -> impl Stream<Item = Result<LogLine, E>> + Send
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: From<std::io::Error> + Send + 'static,
{
    let state = DemuxState {
        chunks,
        demuxer: Demuxer::new(),
        done: false,
    };
    stream::unfold(state, |mut st| async move {
        loop {
            match st.demuxer.next_frame() {
                Ok(Some(frame)) => return Some((Ok(frame.into_line()), st)),
                Ok(None) => {}
                Err(e) => {
                    st.done = true;
                    return Some((Err(E::from(e)), st));
                }
            }
            if st.done {
                return None;
            }
            match st.chunks.next().await {
                Some(Ok(chunk)) => st.demuxer.push(&chunk),
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(e), st));
                }
                None => {
                    st.done = true;
                    return match st.demuxer.finish() {
                        Ok(frame) => frame.map(|f| (Ok(f.into_line()), st)),
                        Err(e) => Some((Err(E::from(e)), st)),
                    };
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::TryStreamExt;

    fn frame(stream: u8, payload: &[u8]) -> Vec<u8> {
        let mut out = vec![stream, 0, 0, 0];
        out.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        out.extend_from_slice(payload);
        out
    }

    async fn lines_of(chunks: Vec<Vec<u8>>) -> Vec<String> {
        let source = stream::iter(
            chunks
                .into_iter()
                .map(|c| Ok::<_, std::io::Error>(Bytes::from(c))),
        );
        demultiplex_bytes(source)
            .map_ok(|l| l.text)
            .try_collect()
            .await
            .unwrap()
    }

    #[test]
    fn decoder_waits_for_complete_header_and_payload() {
        let mut d = Demuxer::new();
        let bytes = frame(1, b"hello\n");
        d.push(&bytes[..5]);
        assert!(d.next_frame().unwrap().is_none());
        d.push(&bytes[5..10]);
        assert!(d.next_frame().unwrap().is_none());
        d.push(&bytes[10..]);
        let f = d.next_frame().unwrap().unwrap();
        assert_eq!(f.stream, LogStreamKind::Stdout);
        assert_eq!(&f.payload[..], b"hello\n");
        assert_eq!(d.buffered(), 0);
    }

    #[test]
    fn decoder_handles_zero_length_payload() {
        let mut d = Demuxer::new();
        d.push(&frame(2, b""));
        let f = d.next_frame().unwrap().unwrap();
        assert_eq!(f.stream, LogStreamKind::Stderr);
        assert!(f.payload.is_empty());
        assert!(d.next_frame().unwrap().is_none());
    }

    #[test]
    fn finish_discards_truncated_tail() {
        let mut d = Demuxer::new();
        d.push(&frame(1, b"partial")[..9]);
        assert!(d.finish().unwrap().is_none());
        assert_eq!(d.buffered(), 0);
    }

    #[tokio::test]
    async fn two_frames_yield_two_lines_in_order() {
        let mut bytes = frame(1, b"line one\n");
        bytes.extend(frame(1, b"line two\n"));
        assert_eq!(lines_of(vec![bytes]).await, vec!["line one\n", "line two\n"]);
    }

    #[tokio::test]
    async fn frame_split_across_chunks() {
        let mut bytes = frame(1, b"line one\n");
        bytes.extend(frame(2, b"line two\n"));
        let (a, b) = bytes.split_at(12);
        assert_eq!(
            lines_of(vec![a.to_vec(), b.to_vec()]).await,
            vec!["line one\n", "line two\n"]
        );
    }

    #[tokio::test]
    async fn empty_input_ends_cleanly() {
        assert!(lines_of(vec![]).await.is_empty());
        assert!(lines_of(vec![Vec::new()]).await.is_empty());
    }

    #[tokio::test]
    async fn already_split_output_passes_through() {
        let source = stream::iter(vec![
            Ok::<_, std::io::Error>(LogOutput::StdOut {
                message: Bytes::from_static(b"out\n"),
            }),
            Ok(LogOutput::StdIn {
                message: Bytes::from_static(b"in\n"),
            }),
            Ok(LogOutput::StdErr {
                message: Bytes::from_static(b"err\n"),
            }),
        ]);
        let lines: Vec<LogLine> = split_output(source).try_collect().await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].stream, LogStreamKind::Stdout);
        assert_eq!(lines[1].stream, LogStreamKind::Stderr);
        assert_eq!(lines[1].text, "err\n");
    }

    #[tokio::test]
    async fn console_text_is_kept_verbatim() {
        // bytes 4..8 of plain text must never be read as a frame length
        let source = stream::iter(vec![
            Ok::<_, std::io::Error>(LogOutput::Console {
                message: Bytes::from_static(b"hello world from a plain line\n"),
            }),
            Ok(LogOutput::StdOut {
                message: Bytes::from_static(b"next\n"),
            }),
        ]);
        let lines: Vec<LogLine> = split_output(source).try_collect().await.unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].stream, LogStreamKind::Console);
        assert_eq!(lines[0].text, "hello world from a plain line\n");
        assert_eq!(lines[1].text, "next\n");
    }

    #[tokio::test]
    async fn source_error_is_forwarded() {
        let source = stream::iter(vec![
            Ok(LogOutput::Console {
                message: Bytes::from_static(b"before\n"),
            }),
            Err(std::io::Error::other("connection reset")),
        ]);
        let results: Vec<Result<LogLine, std::io::Error>> = split_output(source).collect().await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }
}
