//! Exact-match routing table.

use crate::{
    errors::HandlerError,
    http::{
        response::{IntoReply, Reply},
        types::Method,
    },
};
use std::{collections::HashMap, fmt, sync::Arc};

/// A registered route handler: `(path, body) -> reply`.
///
/// Handlers are shared between all workers, hence `Send + Sync`.
pub type RouteHandler = Arc<dyn Fn(&str, &str) -> Result<Reply, HandlerError> + Send + Sync>;

/// Maps `(method, path)` pairs to handlers.
///
/// Matching is literal: no prefixes, no wildcards, no trailing-slash
/// normalization. Registering the same pair twice replaces the first
/// handler.
///
/// Routes are registered through `&mut Router` before the router is handed
/// to [`ServerBuilder::router`](crate::ServerBuilder::router). Once the
/// server is built the table is shared read-only between workers.
///
/// # Examples
/// ```
/// use pool_web::{Method, Reply, Router};
///
/// let mut router = Router::new();
/// router
///     .add_route(Method::Get, "/hello", |_, _| "Hello")
///     .add_route(Method::Post, "/items", |_, body: &str| Reply::created(body));
///
/// assert!(router.get_handler(Method::Get, "/hello").is_some());
/// assert!(router.get_handler(Method::Get, "/hello/").is_none());
/// ```
#[derive(Default, Clone)]
pub struct Router {
    routes: HashMap<(Method, String), RouteHandler>,
}

impl Router {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `(method, path)`, replacing any previous one.
    pub fn add_route<P, F, R>(&mut self, method: Method, path: P, handler: F) -> &mut Self
    where
        P: Into<String>,
        F: Fn(&str, &str) -> R + Send + Sync + 'static,
        R: IntoReply,
    {
        let handler: RouteHandler =
            Arc::new(move |path: &str, body: &str| handler(path, body).into_reply());
        self.insert_handler(method, path, handler)
    }

    /// Registers an already shared handler for `(method, path)`.
    #[inline]
    pub fn insert_handler<P: Into<String>>(
        &mut self,
        method: Method,
        path: P,
        handler: RouteHandler,
    ) -> &mut Self {
        self.routes.insert((method, path.into()), handler);
        self
    }

    /// Returns the handler registered for exactly `(method, path)`.
    #[inline]
    pub fn get_handler(&self, method: Method, path: &str) -> Option<&RouteHandler> {
        // Borrowed lookup would need a custom key type; paths are short.
        self.routes.get(&(method, path.to_owned()))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered `(method, path)` pairs in no particular order.
    pub fn routes(&self) -> impl Iterator<Item = (Method, &str)> + '_ {
        self.routes
            .keys()
            .map(|(method, path)| (*method, path.as_str()))
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.routes()).finish()
    }
}
