//! A `Pipeline` is one declared, possibly-empty sequence of middleware,
//! built once and shared (by reference) across every route group that
//! attaches it.
//!
//! This is a deliberate simplification of threading a `borrow_bag`-indexed
//! *set* of pipelines through the router so a route can be attached to
//! more than one pipeline at once via a declared handle chain. That
//! generality buys little here — see DESIGN.md — so a route group
//! attaches exactly one `Pipeline` (itself composable from as many
//! middleware as needed), kept behind an `Arc` so compiling a route is
//! just cloning a handle.

use std::pin::Pin;
use std::sync::Arc;

use log::trace;

use crate::handler::HandlerFuture;
use crate::middleware::chain::{MiddlewareChain, NewMiddlewareChain};
use crate::middleware::NewMiddleware;
use crate::state::{request_id, State};

/// A built, immutable middleware pipeline.
pub struct Pipeline<T>
where
    T: NewMiddlewareChain,
{
    chain: T,
}

impl<T> Pipeline<T>
where
    T: NewMiddlewareChain,
{
    /// Instantiates one `Middleware` per entry for a single request.
    pub fn construct(&self) -> anyhow::Result<PipelineInstance<T::Instance>> {
        Ok(PipelineInstance {
            chain: self.chain.construct()?,
        })
    }
}

/// An instantiated `Pipeline`, live for exactly one request.
pub struct PipelineInstance<T>
where
    T: MiddlewareChain,
{
    chain: T,
}

impl<T> PipelineInstance<T>
where
    T: MiddlewareChain,
{
    pub fn call<F>(self, state: State, f: F) -> Pin<Box<HandlerFuture>>
    where
        F: FnOnce(State) -> Pin<Box<HandlerFuture>> + Send + 'static,
    {
        trace!("[{}] calling middleware", request_id(&state));
        self.chain.call(state, f)
    }
}

/// Begins declaring a new pipeline.
pub fn new_pipeline() -> PipelineBuilder<()> {
    trace!(" starting pipeline construction");
    PipelineBuilder { chain: () }
}

/// Builds up a `Pipeline`'s middleware list in declaration order.
///
/// Internally the list is consed onto the front (so the type is the
/// reverse of declaration order: `(m3, (m2, (m1, ())))`), but `add`/`build`
/// preserve first-declared-runs-first semantics — see `NewMiddlewareChain`.
pub struct PipelineBuilder<T>
where
    T: NewMiddlewareChain,
{
    chain: T,
}

impl<T> PipelineBuilder<T>
where
    T: NewMiddlewareChain,
{
    pub fn add<M>(self, m: M) -> PipelineBuilder<(M, T)>
    where
        M: NewMiddleware,
        M::Instance: Send + 'static,
    {
        trace!(" adding middleware to pipeline");
        PipelineBuilder {
            chain: (m, self.chain),
        }
    }

    pub fn build(self) -> Arc<Pipeline<T>> {
        Arc::new(Pipeline { chain: self.chain })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, IntoHandlerFuture};
    use crate::response::{Response, ResponseBody};
    use http::{HeaderMap, StatusCode};
    use std::sync::atomic::{AtomicI32, Ordering};

    #[derive(Clone)]
    struct Adder(Arc<AtomicI32>, i32);

    impl crate::middleware::Middleware for Adder {
        fn call<Chain>(self, state: State, chain: Chain) -> Pin<Box<HandlerFuture>>
        where
            Chain: FnOnce(State) -> Pin<Box<HandlerFuture>> + Send + 'static,
        {
            self.0.fetch_add(self.1, Ordering::SeqCst);
            chain(state)
        }
    }

    #[tokio::test]
    async fn pipeline_runs_middleware_then_handler() {
        let total = Arc::new(AtomicI32::new(0));
        let pipeline = new_pipeline()
            .add(Adder(total.clone(), 2))
            .add(Adder(total.clone(), 3))
            .build();

        let instance = pipeline.construct().unwrap();
        let handler = |state: State| {
            (state, Response::new(StatusCode::OK, HeaderMap::new(), ResponseBody::Empty))
                .into_handler_future()
        };
        let (_, response) = instance
            .call(State::new(), move |state| handler.handle(state))
            .await
            .unwrap();

        assert_eq!(total.load(Ordering::SeqCst), 5);
        assert_eq!(response.status(), StatusCode::OK);
    }
}
