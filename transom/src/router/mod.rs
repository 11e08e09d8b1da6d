//! The top-level `Router`: holds the compiled trie and turns a request's
//! method and path into either an invocation of the matched responder or a
//! directly-rendered 404/405.

use std::pin::Pin;

use http::Method;

use crate::handler::HandlerFuture;
use crate::state::{matched_pattern, path_params, State};

pub mod builder;
mod non_match;
mod route;
mod tree;

pub use non_match::RouteNonMatch;
pub use route::CompiledResponder;
pub use tree::{PathParams, SegmentKind};

use tree::Tree;

/// An immutable, built routing table.
pub struct Router {
    tree: Tree,
}

impl Router {
    pub(crate) fn new(tree: Tree) -> Router {
        Router { tree }
    }

    /// Resolves `path` against the trie and either invokes the matched
    /// responder (after recording its captured `PathParams` and matched
    /// pattern on `state`) or resolves immediately with a 404/405.
    pub fn dispatch(&self, mut state: State, method: &Method, path: &str) -> Pin<Box<HandlerFuture>> {
        let segments = crate::uri::decode_segments(path).unwrap_or_default();

        match self.tree.resolve(&segments) {
            Some(resolved) => match resolved.node.responder(method) {
                Some(responder) => {
                    path_params::set(&mut state, resolved.params);
                    matched_pattern::set(&mut state, responder.pattern());
                    responder.invoke(state)
                }
                None => {
                    let non_match = RouteNonMatch::MethodNotAllowed {
                        allowed: resolved.node.allowed_methods(),
                    };
                    Box::pin(async move { Ok((state, non_match.into_response())) })
                }
            },
            None => Box::pin(async move { Ok((state, RouteNonMatch::NotFound.into_response())) }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::builder::build_simple_router;
    use super::*;
    use crate::response::{Response, ResponseBody};
    use http::StatusCode;

    fn ok_handler(state: State) -> (State, Response) {
        (state, Response::new(StatusCode::OK, Default::default(), ResponseBody::Empty))
    }

    #[tokio::test]
    async fn dispatches_to_matched_route() {
        let router = build_simple_router(|route| {
            route.get("/hello", || Ok(ok_handler));
        });

        let (state, response) = router
            .dispatch(State::new(), &Method::GET, "/hello")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(matched_pattern(&state), Some("/hello"));
    }

    #[tokio::test]
    async fn unmatched_path_is_404() {
        let router = build_simple_router(|route| {
            route.get("/hello", || Ok(ok_handler));
        });
        let (_, response) = router
            .dispatch(State::new(), &Method::GET, "/nope")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn wrong_method_is_405_with_allow_header() {
        let router = build_simple_router(|route| {
            route.get("/hello", || Ok(ok_handler));
        });
        let (_, response) = router
            .dispatch(State::new(), &Method::POST, "/hello")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers().get(http::header::ALLOW).unwrap(), "GET");
    }
}
