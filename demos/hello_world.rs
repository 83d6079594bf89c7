use pool_web::{Method, Router, Server, ServerError};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let mut router = Router::new();
    router.add_route(Method::Get, "/", |_, _| "Hello, world!");

    Server::builder()
        .address(([127, 0, 0, 1], 8080))
        .router(router)
        .build()?
        .launch()
        .await;

    Ok(())
}
