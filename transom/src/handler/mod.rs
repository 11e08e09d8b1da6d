//! Defines the `Handler`/`NewHandler` traits that sit at the innermost end
//! of a request's middleware chain, and the `IntoResponse` conversion used
//! to let ordinary functions serve as handlers.

use std::future::Future;
use std::pin::Pin;

use crate::error::HandlerError;
use crate::response::Response;
use crate::state::State;

/// The future type returned by a `Handler`, a `Middleware`, or anything else
/// sitting on the request path: it resolves to either a finished response or
/// a failure, both carrying the `State` back out so the connection handler
/// can read request-id/telemetry data off it regardless of outcome.
pub type HandlerFuture =
    dyn Future<Output = Result<(State, Response), (State, HandlerError)>> + Send;

/// A `Handler` receives some subset of requests to the application and
/// returns a future which resolves to a response. This is the common entry
/// point implemented by route terminals and, indirectly, by middleware
/// chains wrapping them.
pub trait Handler {
    /// Handles the request, returning a boxed future which resolves to a
    /// response.
    fn handle(self, state: State) -> Pin<Box<HandlerFuture>>;
}

/// Creates new `Handler` values, one per request.
///
/// Mirrors the split between a `Handler` (processes one request) and a
/// `NewHandler` (constructs a fresh `Handler` per request) so that handlers
/// which carry `!Sync` internal state can still be registered once and
/// invoked concurrently.
pub trait NewHandler: Send + Sync {
    type Instance: Handler;

    fn new_handler(&self) -> anyhow::Result<Self::Instance>;
}

impl<F, H> NewHandler for F
where
    F: Fn() -> anyhow::Result<H> + Send + Sync,
    H: Handler,
{
    type Instance = H;

    fn new_handler(&self) -> anyhow::Result<H> {
        self()
    }
}

/// Converts a value into the future type returned by a `Handler`, letting
/// ordinary `Fn(State) -> (State, R)` and `async fn(State) -> ...` functions
/// satisfy the `Handler` trait bound via the blanket impl below.
pub trait IntoHandlerFuture {
    fn into_handler_future(self) -> Pin<Box<HandlerFuture>>;
}

impl<T> IntoHandlerFuture for (State, T)
where
    T: IntoResponse,
{
    fn into_handler_future(self) -> Pin<Box<HandlerFuture>> {
        let (state, t) = self;
        let response = t.into_response(&state);
        Box::pin(async move { Ok((state, response)) })
    }
}

impl IntoHandlerFuture for Pin<Box<HandlerFuture>> {
    fn into_handler_future(self) -> Pin<Box<HandlerFuture>> {
        self
    }
}

/// Converts a value into a `Response`. Implemented for `Response` itself
/// (identity) and left open for application code to implement for its own
/// return types.
pub trait IntoResponse {
    fn into_response(self, state: &State) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self, _state: &State) -> Response {
        self
    }
}

impl<F, R> Handler for F
where
    F: FnOnce(State) -> R + Send + 'static,
    R: IntoHandlerFuture,
{
    fn handle(self, state: State) -> Pin<Box<HandlerFuture>> {
        self(state).into_handler_future()
    }
}
