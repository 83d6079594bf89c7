//! Server configuration limits and timeouts
//!
//! Every struct here has conservative defaults and a hidden `_priv` field,
//! so new fields can be added without breaking callers. Override only what
//! you need with struct update syntax.
//!
//! # Examples
//!
//! ```no_run
//! use pool_web::{Method, Router, Server, limits::{ConnLimits, ServerLimits}};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pool_web::ServerError> {
//!     let mut router = Router::new();
//!     router.add_route(Method::Get, "/hello", |_, _| "Hello");
//!
//!     Server::builder()
//!         .address(([127, 0, 0, 1], 8080))
//!         .router(router)
//!         .server_limits(ServerLimits {
//!             worker_count: 32,
//!             min_request_interval: Duration::from_millis(1),
//!             ..ServerLimits::default()
//!         })
//!         .connection_limits(ConnLimits {
//!             socket_read_timeout: Duration::from_secs(5),
//!             ..ConnLimits::default()
//!         })
//!         .build()?
//!         .launch()
//!         .await;
//!
//!     Ok(())
//! }
//! ```

use std::time::Duration;

/// Controls the worker pool, the dispatch queue and admission.
///
/// # Connection management
/// ```text
///                            [------------]
///                            [ Tcp accept ]
///                            [------------]
///                                  ||
///                                  || TCP_STREAM
///                                  \/
/// [--------------]   Yes   /----------------\   No   [-------------]
/// [ Add to queue ] <====== |  Queue bounded |        [ Sending 503 ]
/// [--------------]    \    |  and full?     | =====> [   + close   ]
///        ||           \=== \----------------/        [-------------]
///        ||         (unbounded)
///        \/
/// [--------]   Yes   /---------------------------\   No   [------]
/// [ Worker ] <====== | Is there an idle worker?  | =====> [ Wait ]
/// [--------]         \---------------------------/        [------]
///     ||
///     \/
/// [ Rate limit check ] -- too soon --> [ 429 + close ]
/// ```
///
/// # Workers
/// A worker is an asynchronous task created once when the server launches
/// (with [tokio::spawn]). It loops forever: it takes one connection from
/// the queue and serves every request on it until the peer stops sending,
/// then goes back to the queue. While a worker is busy with a keep-alive
/// connection, other queued connections wait for another worker.
#[derive(Debug, Clone)]
pub struct ServerLimits {
    /// Number of workers serving connections (default: `8`).
    ///
    /// Fixed for the lifetime of the server; the pool is never resized.
    pub worker_count: usize,

    /// Maximum number of accepted connections waiting for a worker
    /// (default: `None`, unbounded).
    ///
    /// With `None` the acceptor never pushes back: under sustained overload
    /// the queue grows without limit. With `Some(n)`, a connection accepted
    /// while `n` are already waiting is answered
    /// [`503`](crate::StatusCode::ServiceUnavailable) and closed.
    pub max_pending_connections: Option<usize>,

    /// Minimum time between two connections from the same address
    /// (default: `100 ms`).
    ///
    /// A connection arriving sooner is answered
    /// [`429`](crate::StatusCode::TooManyRequests) and closed. Set to
    /// [`Duration::ZERO`] to disable rate limiting.
    ///
    /// # Note
    /// The table of last-seen addresses is never pruned and grows with the
    /// number of distinct clients for the life of the process.
    pub min_request_interval: Duration,

    /// Backlog passed to `listen(2)` (default: `128`).
    pub listen_backlog: i32,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ServerLimits {
    fn default() -> Self {
        Self {
            worker_count: 8,
            max_pending_connections: None,
            min_request_interval: Duration::from_millis(100),
            listen_backlog: 128,

            _priv: (),
        }
    }
}

/// Connection-level limits and timeouts
///
/// Default values balance resource usage and tolerance for slow clients.
#[derive(Debug, Clone)]
pub struct ConnLimits {
    /// Maximum time to wait for the next request on a connection
    /// (default: `60 seconds`).
    ///
    /// When it elapses the connection is closed without a response, exactly
    /// as if the peer had closed it. Without this, an idle keep-alive client
    /// would hold a worker forever.
    pub socket_read_timeout: Duration,

    /// Maximum duration of a single response write (default: `3 seconds`).
    ///
    /// A write that does not finish in time ends the connection.
    pub socket_write_timeout: Duration,

    /// Size of the buffer a request is read into (default: `4096 B`).
    ///
    /// A request must arrive in one read; anything beyond this size is
    /// read as the start of the next request.
    pub read_buffer_size: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for ConnLimits {
    #[inline(always)]
    fn default() -> Self {
        Self {
            socket_read_timeout: Duration::from_secs(60),
            socket_write_timeout: Duration::from_secs(3),
            read_buffer_size: 4096,

            _priv: (),
        }
    }
}

/// Configuration for response buffer allocation.
///
/// # Buffer Management
///
/// Each worker keeps one response buffer and reuses it between requests:
/// ```rust
/// # use pool_web::limits::RespLimits;
/// # let limits = RespLimits::default();
/// # let mut buffer: Vec<()> = Vec::with_capacity(limits.default_capacity);
/// #
/// // `buffer` is Vec
/// if buffer.capacity() > limits.max_capacity {
///     buffer = Vec::with_capacity(limits.default_capacity);
/// } else {
///     buffer.clear();
/// }
/// ```
#[derive(Debug, Clone)]
pub struct RespLimits {
    /// Initial buffer capacity allocated for responses (default: `1024 B`)
    pub default_capacity: usize,
    /// Capacity above which the buffer is reallocated on reset (default: `8192 B`)
    pub max_capacity: usize,

    #[doc(hidden)]
    #[allow(dead_code)]
    pub _priv: (),
}

impl Default for RespLimits {
    fn default() -> Self {
        Self {
            default_capacity: 1024,
            max_capacity: 8 * 1024,

            _priv: (),
        }
    }
}
