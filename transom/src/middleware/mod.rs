//! Defines `Middleware`, a reusable unit of logic that wraps a group of
//! routes sharing a `Pipeline`, and `NewMiddleware`, which spawns one
//! instance of it per request.

use std::pin::Pin;

use crate::handler::HandlerFuture;
use crate::state::State;

pub mod chain;

/// A `Middleware` has the opportunity to inspect or modify a request before
/// it reaches its handler, and/or the response on the way back out, by
/// choosing when (and whether) to invoke `chain`.
///
/// By convention a middleware should avoid mutating `State` entries it
/// does not own, and should always eventually call `chain` unless it is
/// deliberately short-circuiting the request (e.g. an auth middleware
/// rejecting an unauthenticated request).
pub trait Middleware: Send + 'static {
    fn call<Chain>(self, state: State, chain: Chain) -> Pin<Box<HandlerFuture>>
    where
        Chain: FnOnce(State) -> Pin<Box<HandlerFuture>> + Send + 'static,
        Self: Sized;
}

/// Spawns fresh `Middleware` instances, one per request, so that
/// `!Sync` per-request state never has to be shared across requests.
pub trait NewMiddleware: Send + Sync {
    type Instance: Middleware;

    fn new_middleware(&self) -> anyhow::Result<Self::Instance>;
}

/// Any `Clone + Send + Sync` middleware can spawn itself by cloning,
/// rather than requiring a derive macro for the same purpose.
impl<T> NewMiddleware for T
where
    T: Middleware + Clone + Send + Sync,
{
    type Instance = T;

    fn new_middleware(&self) -> anyhow::Result<T> {
        Ok(self.clone())
    }
}
