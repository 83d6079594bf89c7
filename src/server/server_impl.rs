use crate::{
    errors::{ErrorKind, ServerError},
    http::{router::Router, types::Version},
    limits::{ConnLimits, RespLimits, ServerLimits},
    server::{
        connection::{writer, HttpConnection},
        queue::DispatchQueue,
        rate_limit::RateLimiter,
    },
};
use socket2::{Domain, Protocol, Socket, Type};
use std::{future::Future, io, net::SocketAddr, sync::Arc};
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};
use tracing::{debug, error, info, warn};

/// State shared by the acceptor and every worker.
///
/// The router is read-only from here on; the rate limiter and the queue
/// synchronize internally.
#[derive(Debug)]
pub(crate) struct ServerContext {
    pub(crate) router: Router,
    pub(crate) rate_limiter: RateLimiter,
    pub(crate) queue: DispatchQueue<(TcpStream, SocketAddr)>,

    pub(crate) server_limits: ServerLimits,
    pub(crate) conn_limits: ConnLimits,
    pub(crate) resp_limits: RespLimits,
}

impl ServerContext {
    pub(crate) fn new(
        router: Router,
        server_limits: ServerLimits,
        conn_limits: ConnLimits,
        resp_limits: RespLimits,
    ) -> Self {
        Self {
            router,
            rate_limiter: RateLimiter::new(server_limits.min_request_interval),
            queue: DispatchQueue::new(),
            server_limits,
            conn_limits,
            resp_limits,
        }
    }
}

/// A bound HTTP server with a fixed pool of workers.
///
/// Connections are accepted by a single loop and pushed onto a queue; each
/// of the [`worker_count`](ServerLimits::worker_count) workers takes one
/// connection at a time and serves it until the peer stops sending.
///
/// # Examples
///
/// ```no_run
/// use pool_web::{Method, Router, Server};
///
/// #[tokio::main]
/// async fn main() -> Result<(), pool_web::ServerError> {
///     let mut router = Router::new();
///     router.add_route(Method::Get, "/hello", |_, _| "Hello");
///
///     Server::builder()
///         .port(8080)
///         .router(router)
///         .build()?
///         .launch()
///         .await;
///
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    context: Arc<ServerContext>,
}

impl Server {
    /// Creates a new builder for configuring the server instance.
    #[inline]
    pub fn builder() -> ServerBuilder {
        ServerBuilder {
            address: None,
            router: None,

            server_limits: None,
            connection_limits: None,
            response_limits: None,
        }
    }

    /// Address the listening socket is bound to.
    ///
    /// Useful after binding port `0`.
    #[inline]
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Starts the workers and accepts connections forever.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), pool_web::ServerError> {
    /// use pool_web::{Router, Server};
    ///
    /// Server::builder()
    ///     .port(8080)
    ///     .router(Router::new())
    ///     .build()?
    ///     .launch()
    ///     .await;
    /// # Ok(())
    /// # }
    /// ```
    #[inline]
    pub async fn launch(self) {
        self.launch_until(std::future::pending()).await
    }

    /// Starts the workers and accepts connections until `shutdown` resolves.
    ///
    /// On shutdown the accept loop stops, parked workers are woken, and
    /// every connection already queued is still served. The call returns
    /// once all workers have exited; the listening socket is released last.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # #[tokio::main]
    /// # async fn main() -> Result<(), pool_web::ServerError> {
    /// use pool_web::{Router, Server};
    ///
    /// Server::builder()
    ///     .port(8080)
    ///     .router(Router::new())
    ///     .build()?
    ///     .launch_until(async {
    ///         let _ = tokio::signal::ctrl_c().await;
    ///     })
    ///     .await;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn launch_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let worker_count = self.context.server_limits.worker_count;
        let workers: Vec<_> = (0..worker_count)
            .map(|id| Self::spawn_worker(id, &self.context))
            .collect();

        match self.listener.local_addr() {
            Ok(address) => info!(%address, workers = worker_count, "server listening"),
            Err(err) => warn!(error = %err, "server listening on unknown address"),
        }

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.admit(stream, peer),
                    Err(err) => warn!(error = %err, "accept failed"),
                },
            }
        }

        info!(queued = self.context.queue.len(), "shutting down");
        self.context.queue.stop();

        for worker in workers {
            if let Err(err) = worker.await {
                error!(error = %err, "worker terminated abnormally");
            }
        }

        info!(
            tracked_addresses = self.context.rate_limiter.tracked_addresses(),
            "server stopped"
        );
        drop(self.listener);
    }

    #[inline]
    fn admit(&self, mut stream: TcpStream, peer: SocketAddr) {
        match self.context.server_limits.max_pending_connections {
            Some(max) if self.context.queue.len() >= max => {
                warn!(%peer, pending = max, "dispatch queue full");
                let write_timeout = self.context.conn_limits.socket_write_timeout;

                tokio::spawn(async move {
                    let rejection = ErrorKind::ServiceUnavailable.as_http(Version::Http11);
                    let _ = writer::write_bytes(&mut stream, rejection, write_timeout).await;
                });
            }
            _ => self.context.queue.push((stream, peer)),
        }
    }

    fn spawn_worker(id: usize, context: &Arc<ServerContext>) -> JoinHandle<()> {
        let context = context.clone();
        let mut conn = HttpConnection::new(context.clone());

        tokio::spawn(async move {
            debug!(worker = id, "worker started");

            while let Some((mut stream, peer)) = context.queue.pop().await {
                debug!(worker = id, %peer, "handling connection");

                if let Err(err) = conn.run(&mut stream, peer).await {
                    debug!(worker = id, %peer, error = %err, "connection ended");
                }
            }

            debug!(worker = id, "worker stopped");
        })
    }
}

//

/// Builder for configuring and creating [`Server`] instances.
///
/// The address and the router are required; all limits fall back to their
/// defaults.
#[derive(Debug)]
pub struct ServerBuilder {
    address: Option<SocketAddr>,
    router: Option<Router>,

    server_limits: Option<ServerLimits>,
    connection_limits: Option<ConnLimits>,
    response_limits: Option<RespLimits>,
}

impl ServerBuilder {
    /// Sets the address to listen on.
    ///
    /// **This or [`port`](Self::port) is required.**
    #[inline(always)]
    pub fn address<A: Into<SocketAddr>>(mut self, address: A) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Listens on `port` on every IPv4 interface.
    #[inline(always)]
    pub fn port(self, port: u16) -> Self {
        self.address(([0, 0, 0, 0], port))
    }

    /// Sets the routing table.
    ///
    /// **This is a required component.** Routes cannot be added once the
    /// server is built.
    #[inline(always)]
    pub fn router(mut self, router: Router) -> Self {
        self.router = Some(router);
        self
    }

    /// Configures the worker pool, the queue and rate limiting.
    #[inline(always)]
    pub fn server_limits(mut self, limits: ServerLimits) -> Self {
        self.server_limits = Some(limits);
        self
    }

    /// Configures per-connection timeouts and buffer size.
    #[inline(always)]
    pub fn connection_limits(mut self, limits: ConnLimits) -> Self {
        self.connection_limits = Some(limits);
        self
    }

    /// Configures response buffer reuse.
    #[inline(always)]
    pub fn response_limits(mut self, limits: RespLimits) -> Self {
        self.response_limits = Some(limits);
        self
    }

    /// Binds the listening socket and constructs a [`Server`].
    ///
    /// Must be called from within a Tokio runtime. Workers are started by
    /// [`Server::launch`], not here.
    ///
    /// # Errors
    ///
    /// Each step of socket setup fails with its own [`ServerError`]
    /// variant: creation, `SO_REUSEADDR`, bind, listen.
    ///
    /// # Panics
    ///
    /// Error messages:
    /// - ``The `address` or `port` method must be called to create``
    /// - ``The `router` method must be called to create``
    #[track_caller]
    pub fn build(self) -> Result<Server, ServerError> {
        let address = self
            .address
            .expect("The `address` or `port` method must be called to create");
        let router = self
            .router
            .expect("The `router` method must be called to create");
        let server_limits = self.server_limits.unwrap_or_default();

        let listener = bind_listener(address, server_limits.listen_backlog)?;
        debug!(%address, routes = router.len(), "listener bound");

        let context = ServerContext::new(
            router,
            server_limits,
            self.connection_limits.unwrap_or_default(),
            self.response_limits.unwrap_or_default(),
        );

        Ok(Server {
            listener,
            context: Arc::new(context),
        })
    }
}

fn bind_listener(address: SocketAddr, backlog: i32) -> Result<TcpListener, ServerError> {
    let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
        .map_err(ServerError::SocketCreation)?;

    socket
        .set_reuse_address(true)
        .map_err(ServerError::SocketOption)?;
    socket
        .bind(&address.into())
        .map_err(|source| ServerError::Bind {
            addr: address,
            source,
        })?;
    socket.listen(backlog).map_err(ServerError::Listen)?;
    socket
        .set_nonblocking(true)
        .map_err(ServerError::SocketOption)?;

    TcpListener::from_std(socket.into()).map_err(ServerError::Listen)
}
