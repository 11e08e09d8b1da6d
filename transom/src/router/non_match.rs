//! The two ways a path can fail to resolve to a responder.

use http::{HeaderValue, Method, StatusCode};
use thiserror::Error;

use crate::response::{Response, ResponseBody};

/// No routable node matched the path at all, or a node matched but had no
/// responder registered for the request's method.
#[derive(Debug, Error)]
pub enum RouteNonMatch {
    /// No node in the trie matches this path; answer `404`.
    #[error("no route matches this path")]
    NotFound,

    /// A node matches the path, but not this method; answer `405` with an
    /// `Allow` header listing the methods that would have matched.
    #[error("method not allowed for this path")]
    MethodNotAllowed { allowed: Vec<Method> },
}

impl RouteNonMatch {
    pub fn allowed_methods(&self) -> &[Method] {
        match self {
            RouteNonMatch::NotFound => &[],
            RouteNonMatch::MethodNotAllowed { allowed } => allowed,
        }
    }

    /// Renders this non-match directly as the response `conn` should send.
    pub fn into_response(self) -> Response {
        match self {
            RouteNonMatch::NotFound => Response::new(StatusCode::NOT_FOUND, Default::default(), ResponseBody::Empty),
            RouteNonMatch::MethodNotAllowed { allowed } => {
                let mut response = Response::new(StatusCode::METHOD_NOT_ALLOWED, Default::default(), ResponseBody::Empty);
                let joined = allowed
                    .iter()
                    .map(Method::as_str)
                    .collect::<Vec<_>>()
                    .join(", ");
                if let Ok(value) = HeaderValue::from_str(&joined) {
                    response.insert_header(http::header::ALLOW, value);
                }
                response
            }
        }
    }
}
