use pool_web::{limits::ServerLimits, Method, Reply, Router, Server, ServerError};
use std::time::Duration;

fn echo(path: &str, body: &str) -> String {
    format!(r#"{{"path": {path:?}, "body": {body:?}}}"#)
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let mut router = Router::new();
    router
        .add_route(Method::Get, "/echo", echo)
        .add_route(Method::Put, "/echo", echo)
        .add_route(Method::Delete, "/echo", echo)
        .add_route(Method::Post, "/echo", |path: &str, body: &str| {
            Reply::created(echo(path, body))
        });

    Server::builder()
        .address(([127, 0, 0, 1], 8080))
        .router(router)
        .server_limits(ServerLimits {
            min_request_interval: Duration::ZERO,
            ..ServerLimits::default()
        })
        .build()?
        .launch_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await;

    Ok(())
}
