//! The three shapes a response body can take, and the producer/sink pair
//! used to stream the `Stream` variant.

use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use http::HeaderMap;
use thiserror::Error;
use tokio::sync::mpsc;

/// A response body, chosen by a handler according to whether it knows the
/// full content up front.
pub enum ResponseBody {
    /// No body at all (e.g. `204`, `304`, or a `HEAD` response).
    Empty,

    /// The full body is already in memory; `conn` emits a `Content-Length`
    /// computed from its length and writes it in one piece.
    Single(Bytes),

    /// The body is produced incrementally; `conn` emits
    /// `Transfer-Encoding: chunked` and drives `producer` to completion,
    /// writing each chunk as it arrives.
    Stream(BodyProducer),
}

impl ResponseBody {
    pub fn content_length(&self) -> Option<usize> {
        match self {
            ResponseBody::Empty => Some(0),
            ResponseBody::Single(b) => Some(b.len()),
            ResponseBody::Stream(_) => None,
        }
    }
}

/// A handler-supplied function that writes a response body through the
/// [`BodySender`] it is given, then consumes itself to signal completion.
/// `conn` owns the other end (a channel receiver) and is the one who
/// invokes this.
pub type BodyProducer =
    Box<dyn FnOnce(BodySender) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send>;

/// Failure writing a streamed response chunk — the consumer (connection
/// handler) went away, almost always because the client disconnected or
/// the connection was aborted by a protocol error elsewhere.
#[derive(Debug, Error, Clone, Copy)]
#[error("response body consumer is gone")]
pub struct SinkClosed;

enum Event {
    Chunk(Bytes),
    Finish(Option<HeaderMap>),
}

/// The producer-facing half of a streamed response body.
///
/// The contract is exactly one call to [`BodySender::finish`] after zero or
/// more calls to [`BodySender::write`]; `conn` treats a producer future
/// that completes without calling `finish` as a protocol-level failure and
/// aborts the connection rather than emit a body with no defined end (see
/// the connection handler's write-idle handling).
pub struct BodySender {
    tx: mpsc::Sender<Event>,
}

impl BodySender {
    pub async fn write(&self, chunk: Bytes) -> Result<(), SinkClosed> {
        self.tx.send(Event::Chunk(chunk)).await.map_err(|_| SinkClosed)
    }

    /// Ends the body, optionally attaching trailers (only meaningful when
    /// the connection negotiated `Transfer-Encoding: chunked`, i.e. always,
    /// since `Stream` always uses chunked framing in this implementation).
    pub async fn finish(self, trailers: Option<HeaderMap>) {
        let _ = self.tx.send(Event::Finish(trailers)).await;
    }
}

/// The consumer-facing half, owned by `conn` while it drives a streamed
/// response body out to the wire.
pub struct BodyReceiver {
    rx: mpsc::Receiver<Event>,
}

/// One step of draining a `BodyReceiver`.
pub enum BodyStep {
    Chunk(Bytes),
    Finished(Option<HeaderMap>),
    /// The producer task ended without calling `finish` — a bug in the
    /// handler/middleware that produced this body.
    ProducerDroppedWithoutFinish,
}

impl BodyReceiver {
    pub async fn next(&mut self) -> BodyStep {
        match self.rx.recv().await {
            Some(Event::Chunk(b)) => BodyStep::Chunk(b),
            Some(Event::Finish(trailers)) => BodyStep::Finished(trailers),
            None => BodyStep::ProducerDroppedWithoutFinish,
        }
    }
}

/// Creates a streamed-response-body channel pair, bounded at `depth`
/// buffered chunks (mirrors `body::make_body`'s backpressure story, here
/// applied to the outbound direction).
pub fn make_response_stream(depth: usize) -> (BodySender, BodyReceiver) {
    let (tx, rx) = mpsc::channel(depth.max(1));
    (BodySender { tx }, BodyReceiver { rx })
}
