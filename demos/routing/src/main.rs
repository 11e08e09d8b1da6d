//! Path parameters, nested scopes, and a small logging middleware.
//!
//! Run with `cargo run -p routing`, then:
//!   curl http://127.0.0.1:7878/products/42
//!   curl http://127.0.0.1:7878/api/widgets/gizmo

use std::pin::Pin;

use http::StatusCode;
use log::info;
use transom::handler::HandlerFuture;
use transom::middleware::Middleware;
use transom::pipeline::new_pipeline;
use transom::request::Request;
use transom::response::Response;
use transom::router::builder::build_router;
use transom::server::{Server, ServerConfig, TcpAcceptor};
use transom::state::path_params;
use transom::state::request_id;
use transom::state::State;

/// Logs the method and path of every request that passes through its
/// pipeline, before handing off to the rest of the chain.
#[derive(Clone)]
struct RequestLogger;

impl Middleware for RequestLogger {
    fn call<Chain>(self, state: State, chain: Chain) -> Pin<Box<HandlerFuture>>
    where
        Chain: FnOnce(State) -> Pin<Box<HandlerFuture>> + Send + 'static,
    {
        {
            let request = state.borrow::<Request>();
            info!("[{}] {} {}", request_id(&state), request.method(), request.path());
        }
        chain(state)
    }
}

fn show_product(state: State) -> (State, Response) {
    let id = path_params(&state).and_then(|p| p.get("id")).unwrap_or("?").to_owned();
    (state, Response::with_body(StatusCode::OK, "text/plain", format!("product #{id}")))
}

fn show_widget(state: State) -> (State, Response) {
    let name = path_params(&state).and_then(|p| p.get("name")).unwrap_or("?").to_owned();
    (state, Response::with_body(StatusCode::OK, "text/plain", format!("widget: {name}")))
}

fn router() -> std::sync::Arc<transom::router::Router> {
    let pipeline = new_pipeline().add(RequestLogger).build();

    build_router(pipeline, |route| {
        route.get("/products/{id}", || Ok(show_product));

        route.scope("/api", |route| {
            route.get("/widgets/{name}", || Ok(show_widget));
        });
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::default();
    println!("listening on http://{}", config.bind_addr);

    let acceptor = TcpAcceptor::bind(&config).await?;
    let server = Server::new(acceptor, router(), config);

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
    async fn product_route_captures_its_id() {
        let (_, response) = router().dispatch(State::new(), &Method::GET, "/products/42").await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().content_length(), Some("product #42".len()));
    }

    #[tokio::test]
    async fn nested_scope_prefixes_the_widget_route() {
        let (_, response) = router()
            .dispatch(State::new(), &Method::GET, "/api/widgets/gizmo")
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.body().content_length(), Some("widget: gizmo".len()));
    }

    #[tokio::test]
    async fn unmatched_path_is_a_404() {
        let (_, response) = router().dispatch(State::new(), &Method::GET, "/nope").await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
