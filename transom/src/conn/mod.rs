//! The per-connection HTTP/1.1 state machine: turns a bidirectional byte
//! stream into a sequence of requests dispatched through a `Router`, and
//! serializes the resulting responses back onto the wire.
//!
//! One `Connection` owns its transport exclusively and serves requests
//! strictly sequentially — the next request line is not read until the
//! current response (and any request body the application left undrained)
//! has been fully consumed. Request-body draining and the application's
//! responder run concurrently (`tokio::join!` in `serve_one`), since the
//! responder is usually the thing draining the body and backpressure
//! across that pair is what gates the socket read.

mod chunked;
mod head;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use bytes::{Buf, BufMut, BytesMut};
use http::{HeaderMap, HeaderValue, Method, StatusCode, Version};
use log::{debug, error, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::watch;

use crate::body::{make_body, BodyError, BodySource};
use crate::error::{HandlerError, ProtocolError, TransomError};
use crate::request::Request;
use crate::response::{make_response_stream, BodyStep, Response, ResponseBody};
use crate::router::Router;
use crate::server::ServerConfig;
use crate::state::client_addr::ClientAddr;
use crate::state::request_id::set_request_id;
use crate::state::State;

use head::ParsedHead;

/// How the inbound body, if any, is framed on the wire.
enum BodyFraming {
    None,
    ContentLength(usize),
    Chunked,
}

/// What the connection should do once the current response has been
/// written.
enum ConnAction {
    KeepAlive,
    Close,
}

pub struct Connection<T> {
    transport: T,
    buf: BytesMut,
    config: Arc<ServerConfig>,
    router: Arc<Router>,
    client_addr: Option<SocketAddr>,
    quiesce: watch::Receiver<bool>,
}

impl<T> Connection<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(
        transport: T,
        config: Arc<ServerConfig>,
        router: Arc<Router>,
        client_addr: Option<SocketAddr>,
        quiesce: watch::Receiver<bool>,
    ) -> Self {
        Connection {
            transport,
            buf: BytesMut::with_capacity(8 * 1024),
            config,
            router,
            client_addr,
            quiesce,
        }
    }

    /// Drives the connection to completion: serves requests until the
    /// client closes the transport, a fault forces the connection closed,
    /// or quiescence is observed between requests.
    pub async fn serve(mut self) {
        loop {
            if *self.quiesce.borrow() {
                return;
            }

            let mut quiesce = self.quiesce.clone();
            let head = tokio::select! {
                biased;
                _ = quiesce.changed() => return,
                result = self.read_head() => result,
            };

            let parsed = match head {
                Ok(Some(parsed)) => parsed,
                Ok(None) => return,
                Err(TransomError::Timeout) => return,
                Err(e) => {
                    debug!("closing connection on malformed request: {e}");
                    let _ = self.write_error_response(Version::HTTP_11, &e).await;
                    return;
                }
            };

            match self.serve_one(parsed).await {
                Ok(ConnAction::KeepAlive) => {
                    if *self.quiesce.borrow() {
                        return;
                    }
                }
                Ok(ConnAction::Close) => return,
                Err(e) => {
                    warn!("closing connection after request error: {e}");
                    return;
                }
            }
        }
    }

    /// Reads, parses, dispatches, and responds to exactly one request.
    async fn serve_one(&mut self, head: ParsedHead) -> Result<ConnAction, TransomError> {
        let ParsedHead {
            method,
            target,
            version,
            headers,
            consumed,
        } = head;
        self.buf.advance(consumed);

        let framing = match determine_body_framing(&headers) {
            Ok(framing) => framing,
            Err(e) => {
                self.write_error_response(version, &TransomError::Protocol(e)).await?;
                return Ok(ConnAction::Close);
            }
        };

        let keep_alive = keep_alive_requested(&headers, version);
        let (source, reader) = make_body(self.config.body_buffer_depth);
        let request = Request::new(method.clone(), target, version, headers, reader);
        let path = request.path().to_owned();

        let mut state = State::new();
        set_request_id(&mut state);
        if let Some(addr) = self.client_addr {
            state.put(ClientAddr::new(addr));
        }
        state.put(request);

        let router = Arc::clone(&self.router);
        let (body_result, dispatch_result) =
            tokio::join!(self.feed_body(source, framing), router.dispatch(state, &method, &path));

        let response = match dispatch_result {
            Ok((_state, response)) => response,
            Err((_state, err)) => response_for_handler_error(&err),
        };

        self.write_response(response, version).await?;

        if body_result.is_err() {
            return Ok(ConnAction::Close);
        }
        Ok(if keep_alive { ConnAction::KeepAlive } else { ConnAction::Close })
    }

    /// Parses one request head from buffered bytes, reading more from the
    /// transport as needed. `Ok(None)` means the peer closed the
    /// connection cleanly while idle (no bytes buffered and no partial
    /// head in flight).
    async fn read_head(&mut self) -> Result<Option<ParsedHead>, TransomError> {
        loop {
            match head::try_parse_head(&self.buf, self.config.max_headers_count) {
                Ok(Some(parsed)) => return Ok(Some(parsed)),
                Ok(None) => {}
                Err(e) => return Err(TransomError::Protocol(e)),
            }

            if !within_head_limits(&self.buf, self.config.max_request_line_len, self.config.max_headers_size) {
                return Err(TransomError::Protocol(ProtocolError::HeadersTooLong));
            }

            if !self.read_more(self.config.read_idle_timeout).await? {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return Err(TransomError::Protocol(ProtocolError::MalformedHead));
            }
        }
    }

    /// Delivers the request body, if any, to `source` as it arrives off
    /// the wire. If the application dropped its `BodyReader` before the
    /// body finished, keeps reading (and discarding) off the transport so
    /// the next request's head starts at the right offset — the
    /// "previous body is drained" half of the no-pipelining contract.
    async fn feed_body(&mut self, source: BodySource, framing: BodyFraming) -> Result<(), TransomError> {
        match framing {
            BodyFraming::None => {
                source.finish().await;
                Ok(())
            }
            BodyFraming::ContentLength(len) => self.feed_fixed_length(source, len).await,
            BodyFraming::Chunked => self.feed_chunked(source).await,
        }
    }

    async fn feed_fixed_length(&mut self, source: BodySource, mut remaining: usize) -> Result<(), TransomError> {
        let mut sink = Some(source);
        while remaining > 0 {
            if self.buf.is_empty() {
                match self.read_more(self.config.read_idle_timeout).await {
                    Ok(true) => {}
                    Ok(false) => {
                        fail_sink(&mut sink, "connection closed before the request body completed").await;
                        return Err(TransomError::Protocol(ProtocolError::MalformedHead));
                    }
                    Err(e) => {
                        fail_sink(&mut sink, &e.to_string()).await;
                        return Err(e);
                    }
                }
            }
            let take = remaining.min(self.buf.len());
            let chunk = self.buf.split_to(take).freeze();
            remaining -= take;
            if let Some(s) = sink.as_ref() {
                if s.yield_chunk(chunk).await.is_err() {
                    sink = None;
                }
            }
        }
        if let Some(s) = sink {
            s.finish().await;
        }
        Ok(())
    }

    async fn feed_chunked(&mut self, source: BodySource) -> Result<(), TransomError> {
        let mut sink = Some(source);
        loop {
            let line = self.read_line(self.config.max_request_line_len).await?;
            let size = chunked::parse_chunk_size_line(&line).map_err(TransomError::Protocol)?;

            if size == 0 {
                loop {
                    let trailer = self.read_line(self.config.max_headers_size).await?;
                    if trailer.is_empty() {
                        break;
                    }
                }
                break;
            }

            let mut remaining = size;
            while remaining > 0 {
                if self.buf.is_empty() {
                    if !self.read_more(self.config.read_idle_timeout).await? {
                        fail_sink(&mut sink, "connection closed mid-chunk").await;
                        return Err(TransomError::Protocol(ProtocolError::MalformedChunk));
                    }
                }
                let take = remaining.min(self.buf.len());
                let chunk = self.buf.split_to(take).freeze();
                remaining -= take;
                if let Some(s) = sink.as_ref() {
                    if s.yield_chunk(chunk).await.is_err() {
                        sink = None;
                    }
                }
            }
            self.expect_crlf().await?;
        }
        if let Some(s) = sink {
            s.finish().await;
        }
        Ok(())
    }

    /// Reads one CRLF-terminated line (the CRLF itself is consumed but not
    /// returned), bounded by `max_len` bytes of lookahead.
    async fn read_line(&mut self, max_len: usize) -> Result<Vec<u8>, TransomError> {
        loop {
            if let Some(pos) = find_crlf(&self.buf) {
                let line = self.buf.split_to(pos).to_vec();
                self.buf.advance(2);
                return Ok(line);
            }
            if self.buf.len() > max_len {
                return Err(TransomError::Protocol(ProtocolError::MalformedChunk));
            }
            if !self.read_more(self.config.read_idle_timeout).await? {
                return Err(TransomError::Protocol(ProtocolError::MalformedChunk));
            }
        }
    }

    async fn expect_crlf(&mut self) -> Result<(), TransomError> {
        while self.buf.len() < 2 {
            if !self.read_more(self.config.read_idle_timeout).await? {
                return Err(TransomError::Protocol(ProtocolError::MalformedChunk));
            }
        }
        if &self.buf[..2] != b"\r\n" {
            return Err(TransomError::Protocol(ProtocolError::MalformedChunk));
        }
        self.buf.advance(2);
        Ok(())
    }

    /// Reads more bytes into `self.buf`. `Ok(false)` means clean EOF.
    async fn read_more(&mut self, idle_timeout: Duration) -> Result<bool, TransomError> {
        match tokio::time::timeout(idle_timeout, self.transport.read_buf(&mut self.buf)).await {
            Ok(Ok(0)) => Ok(false),
            Ok(Ok(_)) => Ok(true),
            Ok(Err(e)) => Err(TransomError::Transport(e)),
            Err(_) => Err(TransomError::Timeout),
        }
    }

    async fn write_all_with_timeout(&mut self, buf: &[u8]) -> Result<(), TransomError> {
        match tokio::time::timeout(self.config.write_idle_timeout, self.transport.write_all(buf)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(TransomError::Transport(e)),
            Err(_) => Err(TransomError::Timeout),
        }
    }

    /// Renders `err` as a direct response with no routing involved, for
    /// faults detected before a request could be dispatched (malformed
    /// head, inconsistent framing). `Timeout`/`Transport` faults get no
    /// response at all, per the error-handling table.
    async fn write_error_response(&mut self, version: Version, err: &TransomError) -> Result<(), TransomError> {
        let status = match err {
            TransomError::Protocol(ProtocolError::UnsupportedVersion) => StatusCode::HTTP_VERSION_NOT_SUPPORTED,
            TransomError::Protocol(_) => StatusCode::BAD_REQUEST,
            TransomError::Body(BodyError::PayloadTooLarge { .. }) => StatusCode::PAYLOAD_TOO_LARGE,
            TransomError::Body(_) => StatusCode::BAD_REQUEST,
            TransomError::Timeout | TransomError::Transport(_) => return Ok(()),
        };
        self.write_response(Response::empty(status), version).await
    }

    /// Writes `head, body*, end` for `response`, deriving framing from the
    /// `ResponseBody` variant rather than trusting any caller-set
    /// `Content-Length`/`Transfer-Encoding` headers.
    async fn write_response(&mut self, response: Response, version: Version) -> Result<(), TransomError> {
        let (status, mut headers, body) = response.into_parts();

        if !headers.contains_key(http::header::DATE) {
            if let Ok(value) = HeaderValue::from_str(&httpdate::fmt_http_date(SystemTime::now())) {
                headers.insert(http::header::DATE, value);
            }
        }
        if !headers.contains_key(http::header::SERVER) {
            if let Ok(value) = HeaderValue::from_str(&self.config.server_name) {
                headers.insert(http::header::SERVER, value);
            }
        }
        headers.remove(http::header::CONTENT_LENGTH);
        headers.remove(http::header::TRANSFER_ENCODING);
        match &body {
            ResponseBody::Stream(_) => {
                headers.insert(http::header::TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
            }
            _ => {
                let len = body.content_length().unwrap_or(0);
                if let Ok(value) = HeaderValue::from_str(&len.to_string()) {
                    headers.insert(http::header::CONTENT_LENGTH, value);
                }
            }
        }

        let mut head = BytesMut::with_capacity(256);
        head.put_slice(format!("{:?} {} {}\r\n", version, status.as_u16(), status.canonical_reason().unwrap_or("")).as_bytes());
        for (name, value) in headers.iter() {
            head.put_slice(name.as_str().as_bytes());
            head.put_slice(b": ");
            head.put_slice(value.as_bytes());
            head.put_slice(b"\r\n");
        }
        head.put_slice(b"\r\n");
        self.write_all_with_timeout(&head).await?;

        match body {
            ResponseBody::Empty => Ok(()),
            ResponseBody::Single(bytes) => self.write_all_with_timeout(&bytes).await,
            ResponseBody::Stream(producer) => self.write_stream_body(producer).await,
        }
    }

    async fn write_stream_body(&mut self, producer: crate::response::BodyProducer) -> Result<(), TransomError> {
        let (sender, mut receiver) = make_response_stream(self.config.body_buffer_depth);
        let handle = tokio::spawn(producer(sender));

        loop {
            match receiver.next().await {
                BodyStep::Chunk(chunk) => {
                    self.write_all_with_timeout(&chunked::encode_chunk(&chunk)).await?;
                }
                BodyStep::Finished(trailers) => {
                    self.write_all_with_timeout(&chunked::encode_last_chunk(trailers.as_ref())).await?;
                    let _ = handle.await;
                    return Ok(());
                }
                BodyStep::ProducerDroppedWithoutFinish => {
                    let _ = handle.await;
                    return Err(TransomError::Transport(std::io::Error::new(
                        std::io::ErrorKind::Other,
                        "response body producer ended without calling finish",
                    )));
                }
            }
        }
    }
}

async fn fail_sink(sink: &mut Option<BodySource>, message: &str) {
    if let Some(source) = sink.take() {
        source.fail(BodyError::Upstream(message.to_owned())).await;
    }
}

fn determine_body_framing(headers: &HeaderMap) -> Result<BodyFraming, ProtocolError> {
    let chunked = headers
        .get(http::header::TRANSFER_ENCODING)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_ascii_lowercase().contains("chunked"))
        .unwrap_or(false);

    let content_length = match headers.get(http::header::CONTENT_LENGTH) {
        Some(value) => {
            let text = value.to_str().map_err(|_| ProtocolError::InvalidHeaderValue)?;
            Some(text.trim().parse::<usize>().map_err(|_| ProtocolError::InconsistentFraming)?)
        }
        None => None,
    };

    match (chunked, content_length) {
        (true, Some(_)) => Err(ProtocolError::InconsistentFraming),
        (true, None) => Ok(BodyFraming::Chunked),
        (false, Some(len)) => Ok(BodyFraming::ContentLength(len)),
        (false, None) => Ok(BodyFraming::None),
    }
}

fn keep_alive_requested(headers: &HeaderMap, version: Version) -> bool {
    if let Some(value) = headers.get(http::header::CONNECTION).and_then(|v| v.to_str().ok()) {
        let lower = value.to_ascii_lowercase();
        if lower.contains("close") {
            return false;
        }
        if lower.contains("keep-alive") {
            return true;
        }
    }
    version != Version::HTTP_10
}

fn response_for_handler_error(err: &HandlerError) -> Response {
    match err.status() {
        Some(status) => {
            let mut response = Response::new(status, HeaderMap::new(), ResponseBody::Empty);
            for (name, value) in err.extra_headers() {
                response.insert_header(name, value);
            }
            response
        }
        None => {
            error!("unhandled error from responder: {err}");
            Response::empty(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

fn within_head_limits(buf: &[u8], max_request_line_len: usize, max_headers_size: usize) -> bool {
    let line_len = buf.iter().position(|&b| b == b'\n').map(|p| p + 1).unwrap_or(buf.len());
    if line_len > max_request_line_len {
        return false;
    }
    buf.len() <= max_request_line_len + max_headers_size
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\r\n")
}
