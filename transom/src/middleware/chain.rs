//! Connects multiple `Middleware` into a "chain" by recursing over a
//! heterogeneous tuple list: a monomorphized fold over `(M1, (M2, (M3,
//! ())))`-shaped nesting, targeting `async`/await's `Pin<Box<dyn Future>>`
//! rather than a boxed `futures::Future`.

use log::trace;

use std::pin::Pin;

use crate::handler::HandlerFuture;
use crate::middleware::{Middleware, NewMiddleware};
use crate::state::{request_id, State};

/// A recursive type representing a pipeline's declared middleware list,
/// used to spawn a `MiddlewareChain` instance for a single request.
///
/// Implemented for nested tuples `(T, U)` with `()` terminating the list,
/// in the reverse order middleware were `add`ed to the `PipelineBuilder`.
pub trait NewMiddlewareChain: Send + Sync {
    type Instance: MiddlewareChain;

    fn construct(&self) -> anyhow::Result<Self::Instance>;
}

impl<T, U> NewMiddlewareChain for (T, U)
where
    T: NewMiddleware,
    T::Instance: Send + 'static,
    U: NewMiddlewareChain,
{
    type Instance = (T::Instance, U::Instance);

    fn construct(&self) -> anyhow::Result<Self::Instance> {
        trace!(" adding middleware instance to pipeline");
        let (ref nm, ref tail) = *self;
        Ok((nm.new_middleware()?, tail.construct()?))
    }
}

impl NewMiddlewareChain for () {
    type Instance = ();

    fn construct(&self) -> anyhow::Result<()> {
        trace!(" completed middleware pipeline construction");
        Ok(())
    }
}

/// A recursive type representing one request's instantiated middleware
/// chain, used to process exactly that request.
pub trait MiddlewareChain: Sized {
    fn call<F>(self, state: State, f: F) -> Pin<Box<HandlerFuture>>
    where
        F: FnOnce(State) -> Pin<Box<HandlerFuture>> + Send + 'static;
}

impl MiddlewareChain for () {
    fn call<F>(self, state: State, f: F) -> Pin<Box<HandlerFuture>>
    where
        F: FnOnce(State) -> Pin<Box<HandlerFuture>> + Send + 'static,
    {
        trace!("pipeline complete, invoking handler");
        f(state)
    }
}

impl<T, U> MiddlewareChain for (T, U)
where
    T: Middleware + Send + 'static,
    U: MiddlewareChain,
{
    fn call<F>(self, state: State, f: F) -> Pin<Box<HandlerFuture>>
    where
        F: FnOnce(State) -> Pin<Box<HandlerFuture>> + Send + 'static,
    {
        let (m, p) = self;
        trace!("[{}] executing middleware", request_id(&state));
        p.call(state, move |state| m.call(state, f))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{Handler, IntoHandlerFuture};
    use crate::response::{Response, ResponseBody};
    use http::StatusCode;
    use std::sync::atomic::{AtomicI32, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct Adder(Arc<AtomicI32>, i32);

    impl Middleware for Adder {
        fn call<Chain>(self, state: State, chain: Chain) -> Pin<Box<HandlerFuture>>
        where
            Chain: FnOnce(State) -> Pin<Box<HandlerFuture>> + Send + 'static,
        {
            self.0.fetch_add(self.1, Ordering::SeqCst);
            chain(state)
        }
    }

    #[tokio::test]
    async fn applies_middleware_in_declared_order() {
        let total = Arc::new(AtomicI32::new(0));
        let chain = (
            Adder(total.clone(), 1),
            (Adder(total.clone(), 10), (Adder(total.clone(), 100), ())),
        );

        let handler = |state: State| {
            (state, Response::new(StatusCode::OK, Default::default(), ResponseBody::Empty))
                .into_handler_future()
        };

        let (_, response) = chain
            .call(State::new(), move |state| handler.handle(state))
            .await
            .unwrap();

        assert_eq!(total.load(Ordering::SeqCst), 111);
        assert_eq!(response.status(), StatusCode::OK);
    }
}
