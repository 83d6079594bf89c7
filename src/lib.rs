//! pool_web - Worker-pool HTTP/1.x server with exact-match routing
//!
//! A small HTTP server for services that need a handful of fixed endpoints
//! and nothing more. Connections are handed to a fixed pool of workers,
//! each client address is rate limited, and a connection stays open for as
//! many requests as the client sends.
//!
//! # Protocol Support
//!
//! - **HTTP/1.1**: persistent connections unless the client sends `Connection: close`
//! - **HTTP/1.0**: persistent only with `Connection: keep-alive`
//! - Methods: `GET`, `POST`, `PUT`, `DELETE`. Anything else is answered `500`.
//!
//! # Request lifecycle
//!
//! 1. The acceptor pushes every new connection onto a shared queue.
//! 2. An idle worker takes it and checks the client address against the
//!    rate limiter. Too soon means `429` and the connection is closed.
//! 3. Each read is parsed as one request and routed by exact
//!    `(method, path)` match. No match means `404`; a failing or panicking
//!    handler means `500`. Either way the worker keeps reading.
//! 4. The connection ends when the client closes it, stays idle past the
//!    [read timeout](limits::ConnLimits::socket_read_timeout), or the
//!    socket fails.
//!
//! # Examples
//!
//! Quick start:
//! ```no_run
//! use pool_web::{Method, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pool_web::ServerError> {
//!     let mut router = Router::new();
//!     router
//!         .add_route(Method::Get, "/hello", |_, _| "Hello, world!")
//!         .add_route(Method::Post, "/echo", |_, body: &str| body.to_string());
//!
//!     Server::builder()
//!         .port(8080)
//!         .router(router)
//!         .build()?
//!         .launch()
//!         .await;
//!
//!     Ok(())
//! }
//! ```
//! Handlers that can fail:
//! ```no_run
//! use pool_web::{Method, Reply, Router, Server};
//!
//! fn create(_: &str, body: &str) -> Result<Reply, std::num::ParseIntError> {
//!     let id: u64 = body.trim().parse()?;
//!     Ok(Reply::created(format!("created {id}")))
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pool_web::ServerError> {
//!     let mut router = Router::new();
//!     router.add_route(Method::Post, "/items", create);
//!
//!     Server::builder()
//!         .address(([127, 0, 0, 1], 8080))
//!         .router(router)
//!         .build()?
//!         .launch_until(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await;
//!
//!     Ok(())
//! }
//! ```
//!
//! See [`limits`] for worker count, queue bound, rate limiting and timeouts.

pub(crate) mod http {
    pub(crate) mod request;
    pub(crate) mod response;
    pub(crate) mod router;
    pub(crate) mod types;
}
pub(crate) mod server {
    pub(crate) mod connection;
    pub(crate) mod queue;
    pub(crate) mod rate_limit;
    pub(crate) mod server_impl;
}
pub(crate) mod errors;
pub mod limits;

pub use crate::{
    errors::{DispatchError, HandlerError, ServerError},
    http::{
        request::Request,
        response::{IntoReply, Reply},
        router::{RouteHandler, Router},
        types::{Method, StatusCode, Version},
    },
    server::server_impl::{Server, ServerBuilder},
};
