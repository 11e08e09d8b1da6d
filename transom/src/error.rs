//! The error taxonomy used across the crate.
//!
//! Each kind described in the request lifecycle corresponds to one variant
//! here (or to a narrower per-component enum that gets folded into this one
//! at the `conn` boundary). See `conn::Connection::serve_one` for how each
//! variant is mapped to wire behaviour.

use http::StatusCode;
use thiserror::Error;

use crate::body::BodyError;

/// Errors that can terminate the request lifecycle before a response has
/// been produced.
///
/// Routing non-matches (404/405) are not represented here: `Router`
/// resolves them directly to a `Response` (see `router::non_match`),
/// since — unlike the faults below — they are an ordinary, expected
/// outcome of dispatch rather than a failure that aborts the connection.
#[derive(Debug, Error)]
pub enum TransomError {
    /// The client sent bytes that could not be parsed as a well-formed
    /// HTTP/1.x request head.
    #[error("malformed request: {0}")]
    Protocol(#[from] ProtocolError),

    /// A request body exceeded the policy configured for the route.
    #[error(transparent)]
    Body(#[from] BodyError),

    /// No read-idle activity within the configured timeout.
    #[error("connection timed out waiting for data")]
    Timeout,

    /// The transport itself failed (I/O error on the underlying stream).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),
}

/// Faults detected while parsing the request line, headers, or body framing.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("request line too long")]
    RequestLineTooLong,

    #[error("headers section too long")]
    HeadersTooLong,

    #[error("too many header fields")]
    TooManyHeaders,

    #[error("malformed request line or headers")]
    MalformedHead,

    #[error("unsupported HTTP version")]
    UnsupportedVersion,

    #[error("Content-Length and Transfer-Encoding: chunked both present and inconsistent")]
    InconsistentFraming,

    #[error("malformed chunked transfer encoding")]
    MalformedChunk,

    #[error("invalid header value")]
    InvalidHeaderValue,
}

/// An error produced by a `Handler` or `Middleware`.
///
/// If the underlying error implements [`HttpError`], the declared status and
/// headers are used to build the response. Otherwise the connection answers
/// with an empty `500`.
pub struct HandlerError {
    inner: anyhow::Error,
    http: Option<Box<dyn HttpError>>,
}

impl HandlerError {
    /// Wrap any error as a plain `HandlerError` with no status capability;
    /// callers get a `500` with an empty body.
    pub fn from_anyhow(inner: anyhow::Error) -> Self {
        HandlerError { inner, http: None }
    }

    /// Wrap an error that knows its own HTTP status/headers.
    pub fn from_http_error<E: HttpError + 'static>(err: E) -> Self {
        let status = err.status_code();
        let inner = anyhow::Error::msg(err.to_string());
        HandlerError {
            inner,
            http: Some(Box::new(WithStatus { status, err })),
        }
    }

    /// The declared status code, if this error implements [`HttpError`].
    pub fn status(&self) -> Option<StatusCode> {
        self.http.as_ref().map(|e| e.status_code())
    }

    pub fn extra_headers(&self) -> Vec<(http::HeaderName, http::HeaderValue)> {
        self.http
            .as_ref()
            .map(|e| e.extra_headers())
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.inner, f)
    }
}

impl std::fmt::Display for HandlerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.inner, f)
    }
}

// Deliberately not `impl std::error::Error for HandlerError` — the same
// reason `anyhow::Error` doesn't: it would make `HandlerError` satisfy the
// blanket `From<E>` below at `E = HandlerError`, conflicting with core's
// reflexive `impl<T> From<T> for T`.

impl<E> From<E> for HandlerError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(e: E) -> Self {
        HandlerError::from_anyhow(anyhow::Error::new(e))
    }
}

/// Implemented by application error types that know which HTTP status and
/// headers they should be reported as.
pub trait HttpError: std::fmt::Display + std::fmt::Debug + Send + Sync {
    /// The status code the connection should answer with.
    fn status_code(&self) -> StatusCode;

    /// Additional response headers to attach (e.g. `WWW-Authenticate`).
    fn extra_headers(&self) -> Vec<(http::HeaderName, http::HeaderValue)> {
        Vec::new()
    }
}

/// `BodyError` already has a blanket `From` conversion into `HandlerError`
/// (via the generic `std::error::Error` impl above), which only ever
/// produces a plain `500`. Giving it an `HttpError` impl as well lets
/// handler code opt into the `413` mapping explicitly, via
/// `HandlerError::from_http_error(err)`, without a conflicting second
/// `From<BodyError>` impl (coherence forbids that alongside the blanket
/// one).
impl HttpError for BodyError {
    fn status_code(&self) -> StatusCode {
        match self {
            BodyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

struct WithStatus<E> {
    status: StatusCode,
    err: E,
}

impl<E: std::fmt::Display> std::fmt::Display for WithStatus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.err, f)
    }
}

impl<E: std::fmt::Debug> std::fmt::Debug for WithStatus<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.err, f)
    }
}

impl<E: std::fmt::Display + std::fmt::Debug + Send + Sync> HttpError for WithStatus<E> {
    fn status_code(&self) -> StatusCode {
        self.status
    }
}

pub type Result<T> = std::result::Result<T, TransomError>;
