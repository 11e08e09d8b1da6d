//! The request body stream: a bounded, backpressured, single-producer
//! single-consumer sequence of byte chunks.
//!
//! `make_body` creates a `(BodyReader, BodySource)` pair. The connection
//! handler owns the `BodySource` and feeds it chunks as they arrive off the
//! wire; the application (by way of a handler or middleware) owns the
//! `BodyReader` and drains it. The channel is bounded at
//! `ServerConfig::body_buffer_depth` (default 1), so a slow consumer
//! naturally back-pressures the socket read: `BodySource::yield_chunk`
//! suspends until the reader has made room.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures_core::Stream;
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors observable from either end of a body stream.
#[derive(Debug, Error, Clone)]
pub enum BodyError {
    /// `BodyReader::collect` accumulated more than the configured bound.
    #[error("request body exceeded the maximum allowed size of {max} bytes")]
    PayloadTooLarge { max: usize },

    /// The producer (connection handler) reported a failure, e.g. a
    /// malformed chunk or a transport error mid-body.
    #[error("request body read failed: {0}")]
    Upstream(String),

    /// The consumer dropped the reader before the body finished; further
    /// `yield_chunk`/`finish` calls on the source observe this.
    #[error("request body reader was dropped")]
    ReaderDropped,
}

enum Event {
    Chunk(Bytes),
    End,
    Err(BodyError),
}

/// The producer half of a body stream, owned by the connection handler.
pub struct BodySource {
    tx: mpsc::Sender<Event>,
}

impl BodySource {
    /// Delivers one chunk to the reader. Suspends if the reader has not
    /// yet consumed the previous chunk (bounded buffer). Returns an error
    /// if the reader has been dropped.
    pub async fn yield_chunk(&self, buf: Bytes) -> Result<(), BodyError> {
        self.tx
            .send(Event::Chunk(buf))
            .await
            .map_err(|_| BodyError::ReaderDropped)
    }

    /// Signals normal end of body.
    pub async fn finish(self) {
        let _ = self.tx.send(Event::End).await;
    }

    /// Signals abnormal end of body; the reader's next poll observes `err`.
    pub async fn fail(self, err: BodyError) {
        let _ = self.tx.send(Event::Err(err)).await;
    }
}

/// The consumer half of a body stream.
///
/// Implements [`Stream`] so it composes with `futures_util::StreamExt`
/// combinators; also offers `collect` as a convenience for handlers that
/// just want the whole body as one buffer.
pub struct BodyReader {
    rx: mpsc::Receiver<Event>,
    done: bool,
}

impl BodyReader {
    /// Concatenates the entire body into a single buffer, failing with
    /// [`BodyError::PayloadTooLarge`] if the cumulative size exceeds
    /// `max_bytes`. Pass `usize::MAX` for "unbounded" (not recommended in
    /// production; see `UploadPolicy`).
    pub async fn collect(mut self, max_bytes: usize) -> Result<Bytes, BodyError> {
        let mut buf = BytesMut::new();
        loop {
            match self.rx.recv().await {
                Some(Event::Chunk(chunk)) => {
                    if buf.len() + chunk.len() > max_bytes {
                        return Err(BodyError::PayloadTooLarge { max: max_bytes });
                    }
                    buf.extend_from_slice(&chunk);
                }
                Some(Event::End) | None => return Ok(buf.freeze()),
                Some(Event::Err(e)) => return Err(e),
            }
        }
    }

    /// An already-finished empty body, for requests with no body at all.
    pub fn empty() -> Self {
        let (source, reader) = make_body(1);
        // Finishing requires an async context; since there is nothing to
        // send, drop the sender immediately, which the reader observes as
        // a clean end (see `Stream` impl below).
        drop(source);
        reader
    }
}

impl Stream for BodyReader {
    type Item = Result<Bytes, BodyError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match Pin::new(&mut self.rx).poll_recv(cx) {
            Poll::Ready(Some(Event::Chunk(b))) => Poll::Ready(Some(Ok(b))),
            Poll::Ready(Some(Event::End)) | Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Ready(Some(Event::Err(e))) => {
                self.done = true;
                Poll::Ready(Some(Err(e)))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

/// Creates a body stream pair bounded at `depth` buffered chunks (use `1`
/// for exact single-slot backpressure, the simplest faithful
/// implementation; `ServerConfig::body_buffer_depth` controls the default
/// used by the connection handler).
pub fn make_body(depth: usize) -> (BodySource, BodyReader) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (BodySource { tx }, BodyReader { rx, done: false })
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn yields_chunks_in_order() {
        let (source, mut reader) = make_body(1);
        let writer = tokio::spawn(async move {
            source.yield_chunk(Bytes::from_static(b"hello ")).await.unwrap();
            source.yield_chunk(Bytes::from_static(b"world")).await.unwrap();
            source.finish().await;
        });

        let mut collected = Vec::new();
        while let Some(chunk) = reader.next().await {
            collected.extend_from_slice(&chunk.unwrap());
        }
        writer.await.unwrap();
        assert_eq!(collected, b"hello world");
    }

    #[tokio::test]
    async fn collect_respects_max_bytes() {
        let (source, reader) = make_body(4);
        tokio::spawn(async move {
            source.yield_chunk(Bytes::from(vec![0u8; 5000])).await.unwrap();
            source.yield_chunk(Bytes::from(vec![0u8; 5000])).await.unwrap();
            source.finish().await;
        });
        let err = reader.collect(4096).await.unwrap_err();
        assert!(matches!(err, BodyError::PayloadTooLarge { max: 4096 }));
    }

    #[tokio::test]
    async fn collect_concatenates_full_body() {
        let (source, reader) = make_body(4);
        tokio::spawn(async move {
            source.yield_chunk(Bytes::from_static(b"abc")).await.unwrap();
            source.yield_chunk(Bytes::from_static(b"def")).await.unwrap();
            source.finish().await;
        });
        let body = reader.collect(usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"abcdef");
    }

    #[tokio::test]
    async fn dropping_reader_fails_next_send() {
        let (source, reader) = make_body(1);
        drop(reader);
        let err = source.yield_chunk(Bytes::from_static(b"x")).await;
        assert!(err.is_err());
    }

    #[tokio::test]
    async fn fail_propagates_to_reader() {
        let (source, mut reader) = make_body(1);
        tokio::spawn(async move {
            source.fail(BodyError::Upstream("boom".into())).await;
        });
        let next = reader.next().await.unwrap();
        assert!(matches!(next, Err(BodyError::Upstream(_))));
    }
}
