//! Accepts connections and spawns one [`Connection`](crate::conn::Connection)
//! task per accepted transport, in the shape of a plain
//! `listener.accept().await; ...; tokio::spawn(handler)` accept loop, with
//! two generalizations: accepting
//! is behind the [`Acceptor`] trait rather than a bare `TcpListener` (so
//! TLS/other transports can be plugged in without touching this module),
//! and shutdown is cooperative via a `tokio::sync::watch` channel rather
//! than left to the embedder's runtime teardown.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use serde::Deserialize;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::conn::Connection;
use crate::router::Router;

/// Server-wide configuration. Every field has a documented default; embed
/// this in an application's own configuration struct (loaded via
/// `serde::Deserialize` from TOML/JSON/env, as the embedder prefers) and
/// pass it to [`Server::new`].
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub backlog: u32,
    pub read_idle_timeout: Duration,
    pub write_idle_timeout: Duration,
    pub max_request_line_len: usize,
    pub max_headers_size: usize,
    pub max_headers_count: usize,
    pub body_buffer_depth: usize,
    pub graceful_shutdown_deadline: Duration,
    pub server_name: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            bind_addr: ([127, 0, 0, 1], 7878).into(),
            backlog: 1024,
            read_idle_timeout: Duration::from_secs(30),
            write_idle_timeout: Duration::from_secs(30),
            max_request_line_len: 8 * 1024,
            max_headers_size: 32 * 1024,
            max_headers_count: 100,
            body_buffer_depth: 1,
            graceful_shutdown_deadline: Duration::from_secs(30),
            server_name: "transom".to_owned(),
        }
    }
}

/// Errors that can prevent the server from starting or shutting down
/// cleanly. `Server::run` never calls `std::process::exit`; embedders map
/// this to a process exit status themselves.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("accept loop failed: {0}")]
    Accept(#[source] std::io::Error),
}

/// A transport source a [`Server`] accepts connections from. Implemented
/// in-tree only for plain TCP ([`TcpAcceptor`]); TLS or other transports
/// are an embedder's responsibility, satisfying this trait the same way.
///
/// Modeled as a boxed-future-returning method rather than an `async fn` in
/// a trait, matching the `HandlerFuture`/`BodyProducer` idiom already used
/// throughout the crate (this predates stable `async fn` in traits and
/// keeps the crate's trait-object story uniform).
pub trait Acceptor: Send + Sync {
    type Conn: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Accepts the next connection, along with its peer address if the
    /// transport exposes one.
    fn accept(&self) -> Pin<Box<dyn Future<Output = std::io::Result<(Self::Conn, Option<SocketAddr>)>> + Send + '_>>;
}

/// The in-tree [`Acceptor`]: plain, unencrypted TCP.
pub struct TcpAcceptor {
    listener: TcpListener,
}

impl TcpAcceptor {
    /// Binds a listener at `config.bind_addr`. `config.backlog` is
    /// advisory: tokio's `TcpListener` does not expose the kernel backlog
    /// knob directly, so this uses the platform default backlog, which is
    /// adequate for every workload this crate targets (see DESIGN.md).
    pub async fn bind(config: &ServerConfig) -> Result<Self, ServerError> {
        let listener = TcpListener::bind(config.bind_addr)
            .await
            .map_err(|source| ServerError::Bind { addr: config.bind_addr, source })?;
        Ok(TcpAcceptor { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

impl Acceptor for TcpAcceptor {
    type Conn = TcpStream;

    fn accept(&self) -> Pin<Box<dyn Future<Output = std::io::Result<(TcpStream, Option<SocketAddr>)>> + Send + '_>> {
        Box::pin(async move {
            let (stream, addr) = self.listener.accept().await?;
            let _ = stream.set_nodelay(true);
            Ok((stream, Some(addr)))
        })
    }
}

/// Accepts connections via `A` and serves each one against `router` until
/// told to quiesce.
pub struct Server<A: Acceptor> {
    acceptor: A,
    router: Arc<Router>,
    config: Arc<ServerConfig>,
    quiesce_tx: watch::Sender<bool>,
    quiesce_rx: watch::Receiver<bool>,
}

impl<A: Acceptor + 'static> Server<A> {
    pub fn new(acceptor: A, router: Arc<Router>, config: ServerConfig) -> Self {
        let (quiesce_tx, quiesce_rx) = watch::channel(false);
        Server {
            acceptor,
            router,
            config: Arc::new(config),
            quiesce_tx,
            quiesce_rx,
        }
    }

    /// A handle that can signal this server to quiesce from elsewhere
    /// (e.g. a task awaiting SIGTERM/Ctrl-C). Wiring signal handling up to
    /// this is the embedder's job; the crate only exposes the seam.
    pub fn quiesce_handle(&self) -> QuiesceHandle {
        QuiesceHandle {
            tx: self.quiesce_tx.clone(),
        }
    }

    /// Accepts and serves connections until `quiesce_handle().quiesce()`
    /// is called (or `shutdown` resolves), then stops accepting new
    /// connections and waits up to `graceful_shutdown_deadline` for every
    /// in-flight connection to finish on its own before returning.
    pub async fn run(self, shutdown: impl Future<Output = ()>) -> Result<(), ServerError> {
        let Server {
            acceptor,
            router,
            config,
            quiesce_tx,
            quiesce_rx,
        } = self;

        let mut handles: Vec<JoinHandle<()>> = Vec::new();
        let mut shutdown = Box::pin(shutdown);
        let mut quiesce_signal = quiesce_rx.clone();

        loop {
            if *quiesce_signal.borrow() {
                break;
            }
            tokio::select! {
                biased;
                _ = quiesce_signal.changed() => break,
                _ = &mut shutdown => break,
                accepted = acceptor.accept() => {
                    match accepted {
                        Ok((conn, client_addr)) => {
                            let router = Arc::clone(&router);
                            let config = Arc::clone(&config);
                            let rx = quiesce_rx.clone();
                            handles.push(tokio::spawn(async move {
                                Connection::new(conn, config, router, client_addr, rx).serve().await;
                            }));
                        }
                        Err(e) => {
                            warn!("accept failed: {e}");
                        }
                    }
                }
            }
        }

        info!("quiescing: no longer accepting new connections");
        let _ = quiesce_tx.send(true);

        let drain = futures_util::future::join_all(handles);
        match tokio::time::timeout(config.graceful_shutdown_deadline, drain).await {
            Ok(_) => debug!("all connections drained before the shutdown deadline"),
            Err(_) => error!("graceful shutdown deadline elapsed with connections still in flight"),
        }

        Ok(())
    }
}

/// A cloneable handle that triggers [`Server::run`]'s quiescence.
#[derive(Clone)]
pub struct QuiesceHandle {
    tx: watch::Sender<bool>,
}

impl QuiesceHandle {
    pub fn quiesce(&self) {
        let _ = self.tx.send(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::IntoHandlerFuture;
    use crate::response::{Response, ResponseBody};
    use crate::router::builder::build_simple_router;
    use crate::state::State;
    use http::StatusCode;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn ok_router() -> Arc<Router> {
        build_simple_router(|route| {
            route.get("/", || Ok(|state: State| (state, Response::empty(StatusCode::OK)).into_handler_future()));
        })
    }

    #[tokio::test]
    async fn serves_one_request_then_quiesces_cleanly() {
        let config = ServerConfig {
            bind_addr: ([127, 0, 0, 1], 0).into(),
            ..ServerConfig::default()
        };
        let acceptor = TcpAcceptor::bind(&config).await.unwrap();
        let addr = acceptor.local_addr().unwrap();
        let server = Server::new(acceptor, ok_router(), config);
        let quiesce = server.quiesce_handle();

        let run_handle = tokio::spawn(server.run(std::future::pending()));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await.unwrap();
        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();
        assert!(String::from_utf8_lossy(&buf).starts_with("HTTP/1.1 200"));

        quiesce.quiesce();
        let result = tokio::time::timeout(Duration::from_secs(5), run_handle).await;
        assert!(result.is_ok(), "server did not shut down within the test timeout");
    }

    #[tokio::test]
    async fn rejects_new_connections_after_quiesce() {
        let config = ServerConfig {
            bind_addr: ([127, 0, 0, 1], 0).into(),
            ..ServerConfig::default()
        };
        let acceptor = TcpAcceptor::bind(&config).await.unwrap();
        let addr = acceptor.local_addr().unwrap();
        let server = Server::new(acceptor, ok_router(), config);
        let quiesce = server.quiesce_handle();

        quiesce.quiesce();
        let run_handle = tokio::spawn(server.run(std::future::pending()));
        let _ = tokio::time::timeout(Duration::from_secs(5), run_handle).await.unwrap();

        // The listener is dropped once `run` returns, so a connect attempt
        // now fails rather than being silently accepted.
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
