//! transom &ndash; an async HTTP/1.1 server framework core: a connection
//! state machine, streaming request/response bodies, a path-parameterized
//! router trie, and composable middleware, built directly on `tokio`.
//!
//! This crate is the engine a web framework is built around, not a
//! framework itself: it has no templating, no ORM, no cookie jar, no
//! configuration DSL. It owns exactly the request lifecycle — bytes in,
//! `Request` out, routed and middleware-wrapped to a `Response`, bytes
//! back out — and nothing else.
//!
//! ```no_run
//! use std::sync::Arc;
//! use http::StatusCode;
//! use transom::handler::IntoHandlerFuture;
//! use transom::response::Response;
//! use transom::router::builder::build_simple_router;
//! use transom::server::{Server, ServerConfig, TcpAcceptor};
//! use transom::state::State;
//!
//! fn hello(state: State) -> (State, Response) {
//!     (state, Response::with_body(StatusCode::OK, "text/plain", "Hello, world!"))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = build_simple_router(|route| {
//!         route.get("/", || Ok(hello));
//!     });
//!
//!     let config = ServerConfig::default();
//!     let acceptor = TcpAcceptor::bind(&config).await?;
//!     let server = Server::new(acceptor, router, config);
//!     server.run(std::future::pending()).await?;
//!     Ok(())
//! }
//! ```

pub mod body;
pub mod conn;
pub mod error;
pub mod handler;
pub mod middleware;
pub mod pipeline;
pub mod request;
pub mod response;
pub mod router;
pub mod server;
pub mod state;
pub mod uri;

pub use conn::Connection;
pub use error::{HandlerError, TransomError};
pub use handler::{Handler, HandlerFuture, NewHandler};
pub use request::Request;
pub use response::Response;
pub use router::Router;
pub use server::{Server, ServerConfig, ServerError};
pub use state::State;
