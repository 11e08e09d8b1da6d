//! `CompiledResponder`: the value stored per-(node, method) in the router
//! trie. Compiling a route folds its group's `Pipeline` (a monomorphized
//! middleware chain) around a terminal `NewHandler`, then erases the
//! resulting concrete type behind `Arc<dyn Fn>` so the trie itself can
//! stay a plain `HashMap<Method, CompiledResponder>` regardless of how
//! many distinct pipeline/handler type combinations the application
//! declares — a "boxed terminal while inner stacks stay monomorphized"
//! split between dispatch and the middleware chain, with the
//! heterogeneous-list generality of attaching a route to more than one
//! pipeline at once dropped in favor of one `Pipeline` per route group
//! (see `pipeline` and DESIGN.md).

use std::pin::Pin;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::handler::{Handler, HandlerFuture, NewHandler};
use crate::middleware::chain::{MiddlewareChain, NewMiddlewareChain};
use crate::pipeline::Pipeline;
use crate::state::State;

type Call = dyn Fn(State) -> Pin<Box<HandlerFuture>> + Send + Sync;

/// A fully-assembled, per-route responder: the route's pipeline plus its
/// terminal handler, ready to be invoked once a request has matched.
#[derive(Clone)]
pub struct CompiledResponder {
    pattern: Arc<str>,
    call: Arc<Call>,
}

impl CompiledResponder {
    /// Composes `pipeline` and `handler` into a `CompiledResponder`.
    /// `pattern` is the route's declared path pattern, recorded so
    /// `conn`/telemetry middleware can read back which route matched (see
    /// `state::matched_pattern`).
    pub fn compile<T, H>(pattern: impl Into<Arc<str>>, pipeline: Arc<Pipeline<T>>, handler: H) -> Self
    where
        T: NewMiddlewareChain + Send + Sync + 'static,
        T::Instance: Send + 'static,
        H: NewHandler + 'static,
    {
        let handler = Arc::new(handler);
        let call: Arc<Call> = Arc::new(move |state: State| -> Pin<Box<HandlerFuture>> {
            let pipeline = Arc::clone(&pipeline);
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let instance = match pipeline.construct() {
                    Ok(instance) => instance,
                    Err(e) => return Err((state, HandlerError::from_anyhow(e))),
                };
                let handler = match handler.new_handler() {
                    Ok(h) => h,
                    Err(e) => return Err((state, HandlerError::from_anyhow(e))),
                };
                instance.call(state, move |state| handler.handle(state)).await
            })
        });
        CompiledResponder {
            pattern: pattern.into(),
            call,
        }
    }

    /// The path pattern this responder was registered under.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn invoke(&self, state: State) -> Pin<Box<HandlerFuture>> {
        (self.call)(state)
    }

    #[cfg(test)]
    pub fn tag(&self) -> &str {
        &self.pattern
    }
}

#[cfg(test)]
pub mod test_support {
    use super::CompiledResponder;
    use crate::handler::IntoHandlerFuture;
    use crate::pipeline::new_pipeline;
    use crate::response::{Response, ResponseBody};
    use crate::state::State;
    use http::{HeaderMap, StatusCode};

    /// A responder carrying no middleware, whose handler ignores the
    /// request and answers `200` with an empty body; `tag()` recovers
    /// `name` so router trie tests can assert which pattern matched.
    pub fn dummy_responder(name: &str) -> CompiledResponder {
        let pipeline = new_pipeline().build();
        let handler = move || {
            Ok(|state: State| {
                (state, Response::new(StatusCode::OK, HeaderMap::new(), ResponseBody::Empty))
                    .into_handler_future()
            })
        };
        CompiledResponder::compile(name.to_owned(), pipeline, handler)
    }
}
