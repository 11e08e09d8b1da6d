//! The smallest possible transom application: one route, no middleware.
//!
//! Run with `cargo run -p hello_world`, then `curl http://127.0.0.1:7878/`.

use http::StatusCode;
use transom::response::Response;
use transom::router::builder::build_simple_router;
use transom::server::{Server, ServerConfig, TcpAcceptor};
use transom::state::State;

fn say_hello(state: State) -> (State, Response) {
    (state, Response::with_body(StatusCode::OK, "text/plain", "Hello, world!"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let router = build_simple_router(|route| {
        route.get("/", || Ok(say_hello));
    });

    let config = ServerConfig::default();
    println!("listening on http://{}", config.bind_addr);

    let acceptor = TcpAcceptor::bind(&config).await?;
    let server = Server::new(acceptor, router, config);

    server.run(async {
        let _ = tokio::signal::ctrl_c().await;
    }).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    #[tokio::test]
    async fn root_responds_with_the_greeting() {
        let router = build_simple_router(|route| {
            route.get("/", || Ok(say_hello));
        });

        let (_, response) = router.dispatch(State::new(), &Method::GET, "/").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().content_length(), Some("Hello, world!".len()));
    }
}
