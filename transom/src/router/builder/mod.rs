//! A builder API for declaring routes, grouped by path prefix and/or by
//! the `Pipeline` attached to them.
//!
//! This deliberately drops the generality of a `borrow_bag`-indexed
//! pipeline *set* (which lets one route attach to an arbitrary set of
//! pipelines addressed by a declared handle chain) in favor of a single
//! pipeline in scope at a time, swapped via `RouterBuilder::group` — see
//! DESIGN.md for why that generality isn't needed here.

use std::sync::Arc;

use http::Method;

use crate::handler::NewHandler;
use crate::middleware::chain::NewMiddlewareChain;
use crate::pipeline::{new_pipeline, Pipeline};
use crate::router::route::CompiledResponder;
use crate::router::tree::Tree;
use crate::router::Router;

/// Declares routes against a `Tree` under one path prefix and one
/// `Pipeline`, both inherited by nested `scope`/`group` calls unless
/// overridden.
pub struct RouterBuilder<'a, C: NewMiddlewareChain> {
    tree: &'a mut Tree,
    pipeline: Arc<Pipeline<C>>,
    prefix: String,
}

impl<'a, C> RouterBuilder<'a, C>
where
    C: NewMiddlewareChain + Send + Sync + 'static,
    C::Instance: Send + 'static,
{
    fn joined(&self, path: &str) -> String {
        format!("{}{}", self.prefix, path)
    }

    /// Registers `handler` for `method` at `path` (prefixed by any
    /// enclosing `scope`).
    ///
    /// # Panics
    ///
    /// If `method` is already registered at the resulting pattern.
    pub fn add_route<H>(&mut self, method: Method, path: &str, handler: H) -> &mut Self
    where
        H: NewHandler + 'static,
    {
        let pattern = self.joined(path);
        let responder = CompiledResponder::compile(pattern.clone(), Arc::clone(&self.pipeline), handler);
        self.tree.add_route(&pattern, method, responder);
        self
    }

    pub fn get<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: NewHandler + 'static,
    {
        self.add_route(Method::GET, path, handler)
    }

    pub fn post<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: NewHandler + 'static,
    {
        self.add_route(Method::POST, path, handler)
    }

    pub fn put<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: NewHandler + 'static,
    {
        self.add_route(Method::PUT, path, handler)
    }

    pub fn patch<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: NewHandler + 'static,
    {
        self.add_route(Method::PATCH, path, handler)
    }

    pub fn delete<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: NewHandler + 'static,
    {
        self.add_route(Method::DELETE, path, handler)
    }

    pub fn options<H>(&mut self, path: &str, handler: H) -> &mut Self
    where
        H: NewHandler + 'static,
    {
        self.add_route(Method::OPTIONS, path, handler)
    }

    /// Nests a group of routes under `path`, inheriting the current
    /// pipeline.
    pub fn scope<F>(&mut self, path: &str, f: F)
    where
        F: FnOnce(&mut RouterBuilder<C>),
    {
        let mut nested = RouterBuilder {
            tree: self.tree,
            pipeline: Arc::clone(&self.pipeline),
            prefix: self.joined(path),
        };
        f(&mut nested);
    }

    /// Nests a group of routes sharing `path`'s current prefix but a
    /// different `Pipeline`.
    pub fn group<C2, F>(&mut self, pipeline: Arc<Pipeline<C2>>, f: F)
    where
        C2: NewMiddlewareChain + Send + Sync + 'static,
        C2::Instance: Send + 'static,
        F: FnOnce(&mut RouterBuilder<C2>),
    {
        let mut nested = RouterBuilder {
            tree: self.tree,
            pipeline,
            prefix: self.prefix.clone(),
        };
        f(&mut nested);
    }
}

/// Builds a `Router` whose top-level routes run through `pipeline`.
/// Routes are declared via the closure `f`, using `scope`/`group` to
/// nest path prefixes and alternate pipelines.
pub fn build_router<C, F>(pipeline: Arc<Pipeline<C>>, f: F) -> Arc<Router>
where
    C: NewMiddlewareChain + Send + Sync + 'static,
    C::Instance: Send + 'static,
    F: FnOnce(&mut RouterBuilder<C>),
{
    let mut tree = Tree::new();
    {
        let mut builder = RouterBuilder {
            tree: &mut tree,
            pipeline,
            prefix: String::new(),
        };
        f(&mut builder);
    }
    tree.finalize();
    Arc::new(Router::new(tree))
}

/// Builds a `Router` with no middleware at its top level.
pub fn build_simple_router<F>(f: F) -> Arc<Router>
where
    F: FnOnce(&mut RouterBuilder<()>),
{
    build_router(new_pipeline().build(), f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::{Response, ResponseBody};
    use crate::state::State;
    use http::StatusCode;

    fn ok(state: State) -> (State, Response) {
        (state, Response::new(StatusCode::OK, Default::default(), ResponseBody::Empty))
    }

    #[tokio::test]
    async fn scope_prefixes_nested_routes() {
        let router = build_simple_router(|route| {
            route.scope("/api", |route| {
                route.get("/widgets", || Ok(ok));
            });
        });

        let (_, response) = router
            .dispatch(State::new(), &Method::GET, "/api/widgets")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn get_registers_only_get() {
        let router = build_simple_router(|route| {
            route.get("/widgets", || Ok(ok));
        });

        let (_, response) = router
            .dispatch(State::new(), &Method::HEAD, "/widgets")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(http::header::ALLOW).unwrap(), "GET");
    }
}
