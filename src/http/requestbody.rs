//! Request body for POST operations.
//!
//! Buffered bodies are sent with an exact `Content-Length`. Streamed bodies
//! (multipart uploads) are fed through an in-memory pipe and go out with
//! chunked transfer encoding.

use crate::base::neterror::NetError;
use bytes::Bytes;
use http_body::{Body, Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::io::{AsyncRead, DuplexStream, ReadBuf};

/// Bytes the producer may run ahead of the connection.
pub const PIPE_CAPACITY: usize = 64 * 1024;

const READ_CHUNK_SIZE: usize = 16 * 1024;

/// Request body for HTTP methods that send data.
#[derive(Debug, Default)]
pub enum RequestBody {
    /// No body (GET).
    #[default]
    Empty,
    /// Body with raw bytes.
    Bytes(Bytes),
    /// Body produced while the request is in flight.
    Streaming(StreamingBody),
}

impl From<String> for RequestBody {
    fn from(s: String) -> Self {
        RequestBody::Bytes(Bytes::from(s))
    }
}

impl From<Vec<u8>> for RequestBody {
    fn from(v: Vec<u8>) -> Self {
        RequestBody::Bytes(Bytes::from(v))
    }
}

impl From<&str> for RequestBody {
    fn from(s: &str) -> Self {
        RequestBody::Bytes(Bytes::from(s.to_owned()))
    }
}

impl From<Bytes> for RequestBody {
    fn from(b: Bytes) -> Self {
        RequestBody::Bytes(b)
    }
}

impl RequestBody {
    /// Create a streamed body and the writer that feeds it.
    ///
    /// Dropping the writer ends the body. Dropping the body makes further
    /// writes fail with `BrokenPipe`.
    pub fn pipe() -> (DuplexStream, RequestBody) {
        let (writer, reader) = tokio::io::duplex(PIPE_CAPACITY);
        let body = StreamingBody {
            reader,
            buf: vec![0u8; READ_CHUNK_SIZE],
            done: false,
        };
        (writer, RequestBody::Streaming(body))
    }

    /// Check if the body is empty.
    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Length in bytes, if known up front.
    pub fn content_length(&self) -> Option<u64> {
        match self {
            RequestBody::Empty => Some(0),
            RequestBody::Bytes(b) => Some(b.len() as u64),
            RequestBody::Streaming(_) => None,
        }
    }

    /// Copy the body for resending, if it can be replayed.
    pub fn try_clone(&self) -> Option<RequestBody> {
        match self {
            RequestBody::Empty => Some(RequestBody::Empty),
            RequestBody::Bytes(b) => Some(RequestBody::Bytes(b.clone())),
            RequestBody::Streaming(_) => None,
        }
    }
}

impl Body for RequestBody {
    type Data = Bytes;
    type Error = NetError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        match self.get_mut() {
            RequestBody::Empty => Poll::Ready(None),
            RequestBody::Bytes(b) => {
                if b.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(Frame::data(std::mem::take(b)))))
                }
            }
            RequestBody::Streaming(s) => Pin::new(s).poll_frame(cx),
        }
    }

    fn is_end_stream(&self) -> bool {
        match self {
            RequestBody::Empty => true,
            RequestBody::Bytes(b) => b.is_empty(),
            RequestBody::Streaming(s) => s.done,
        }
    }

    fn size_hint(&self) -> SizeHint {
        match self {
            RequestBody::Empty => SizeHint::with_exact(0),
            RequestBody::Bytes(b) => SizeHint::with_exact(b.len() as u64),
            RequestBody::Streaming(_) => SizeHint::default(),
        }
    }
}

/// Read half of a body pipe.
#[derive(Debug)]
pub struct StreamingBody {
    reader: DuplexStream,
    buf: Vec<u8>,
    done: bool,
}

impl Body for StreamingBody {
    type Data = Bytes;
    type Error = NetError;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }

        let mut read_buf = ReadBuf::new(&mut this.buf);
        match Pin::new(&mut this.reader).poll_read(cx, &mut read_buf) {
            Poll::Ready(Ok(())) => {
                let filled = read_buf.filled();
                if filled.is_empty() {
                    this.done = true;
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(Frame::data(Bytes::copy_from_slice(filled)))))
                }
            }
            Poll::Ready(Err(e)) => {
                this.done = true;
                tracing::debug!(error = %e, "request body pipe failed");
                Poll::Ready(Some(Err(NetError::BodySourceFailed)))
            }
            Poll::Pending => Poll::Pending,
        }
    }

    fn is_end_stream(&self) -> bool {
        self.done
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;
    use tokio::io::AsyncWriteExt;

    #[test]
    fn test_empty_body() {
        let body = RequestBody::Empty;
        assert!(body.is_empty());
        assert_eq!(body.content_length(), Some(0));
        assert!(body.is_end_stream());
    }

    #[test]
    fn test_bytes_body() {
        let body = RequestBody::Bytes(Bytes::from("hello"));
        assert!(!body.is_empty());
        assert_eq!(body.content_length(), Some(5));
        assert_eq!(body.size_hint().exact(), Some(5));
    }

    #[test]
    fn test_conversions() {
        let body: RequestBody = "hello world".to_string().into();
        assert_eq!(body.content_length(), Some(11));

        let body: RequestBody = "test".into();
        assert_eq!(body.content_length(), Some(4));

        let body: RequestBody = vec![1u8, 2, 3, 4].into();
        assert_eq!(body.content_length(), Some(4));

        let body: RequestBody = Bytes::from_static(b"raw").into();
        assert_eq!(body.content_length(), Some(3));
    }

    #[test]
    fn test_default_is_empty() {
        assert!(RequestBody::default().is_empty());
    }

    #[test]
    fn test_try_clone() {
        let body: RequestBody = "data".into();
        let copy = body.try_clone().unwrap();
        assert_eq!(copy.content_length(), Some(4));

        let (_writer, streamed) = RequestBody::pipe();
        assert!(streamed.try_clone().is_none());
        assert_eq!(streamed.content_length(), None);
    }

    #[tokio::test]
    async fn test_bytes_body_collects() {
        let body: RequestBody = "payload".into();
        let collected = body.collect().await.unwrap().to_bytes();
        assert_eq!(&collected[..], b"payload");
    }

    #[tokio::test]
    async fn test_pipe_streams_until_writer_dropped() {
        let (mut writer, body) = RequestBody::pipe();

        let producer = tokio::spawn(async move {
            writer.write_all(b"part one, ").await.unwrap();
            writer.write_all(b"part two").await.unwrap();
        });

        let collected = body.collect().await.unwrap().to_bytes();
        producer.await.unwrap();
        assert_eq!(&collected[..], b"part one, part two");
    }

    #[tokio::test]
    async fn test_pipe_writer_fails_after_body_dropped() {
        let (mut writer, body) = RequestBody::pipe();
        drop(body);
        let err = writer.write_all(b"late").await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::BrokenPipe);
    }
}
