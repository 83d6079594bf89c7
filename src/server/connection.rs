use crate::{
    errors::{DispatchError, ErrorKind, HandlerError},
    http::{
        request::Request,
        response::{Reply, Response},
        types::{Method, Version},
    },
    server::server_impl::ServerContext,
};
use std::{
    any::Any,
    io,
    net::SocketAddr,
    panic::{catch_unwind, AssertUnwindSafe},
    sync::Arc,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite};
use tracing::{debug, warn};

/// Serves one connection at a time for a single worker.
///
/// The read and response buffers are allocated once per worker and reused
/// for every connection it picks up.
pub(crate) struct HttpConnection {
    context: Arc<ServerContext>,
    buffer: Box<[u8]>,
    response: Response,
}

/// What the dispatch step decided for one request.
#[derive(Debug, PartialEq)]
pub(crate) enum Outcome {
    Routed {
        version: Version,
        reply: Reply,
        keep_alive: bool,
    },
    NotFound(Version),
    Failed(Version, DispatchError),
}

impl HttpConnection {
    #[inline]
    pub(crate) fn new(context: Arc<ServerContext>) -> Self {
        let buffer = vec![0; context.conn_limits.read_buffer_size.max(1)].into_boxed_slice();
        let response = Response::new(&context.resp_limits);

        Self {
            context,
            buffer,
            response,
        }
    }
}

impl HttpConnection {
    /// Runs the request loop until the peer stops sending.
    ///
    /// Returns an error only when the socket itself failed; every
    /// per-request problem is answered on the wire and the loop goes on.
    pub(crate) async fn run<S>(&mut self, stream: &mut S, peer: SocketAddr) -> Result<(), io::Error>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let write_timeout = self.context.conn_limits.socket_write_timeout;
        let address = peer.ip().to_string();

        if self.context.rate_limiter.too_many_requests(&address) {
            debug!(%peer, "rate limited");
            let rejection = ErrorKind::TooManyRequests.as_http(Version::Http11);
            return writer::write_bytes(stream, rejection, write_timeout).await;
        }

        loop {
            let len = self.fill_buffer(stream).await?;
            if len == 0 {
                debug!(%peer, "peer closed connection");
                break;
            }

            self.response.reset(&self.context.resp_limits);

            let bytes: &[u8] = match self.dispatch(len) {
                Outcome::Routed {
                    version,
                    reply,
                    keep_alive,
                } => {
                    debug!(%peer, status = reply.status().as_u16(), keep_alive, "routed");
                    self.response.write_reply(version, &reply, keep_alive);
                    self.response.buffer()
                }
                Outcome::NotFound(version) => {
                    debug!(%peer, "no matching route");
                    ErrorKind::NotFound.as_http(version)
                }
                Outcome::Failed(version, err) => {
                    warn!(%peer, error = %err, "request failed");
                    ErrorKind::from(&err).as_http(version)
                }
            };

            writer::write_bytes(stream, bytes, write_timeout).await?;
        }

        Ok(())
    }

    /// Parses, routes and invokes the handler for the first `len` bytes of
    /// the read buffer.
    pub(crate) fn dispatch(&self, len: usize) -> Outcome {
        let request = match Request::parse(&self.buffer[..len]) {
            Ok(request) => request,
            Err(err) => return Outcome::Failed(Version::Http11, err),
        };
        let version = request.version();

        let method = match Method::from_token(request.method()) {
            Ok(method) => method,
            Err(err) => return Outcome::Failed(version, err),
        };

        let Some(handler) = self.context.router.get_handler(method, request.path()) else {
            return Outcome::NotFound(version);
        };

        let result = catch_unwind(AssertUnwindSafe(|| handler(request.path(), request.body())))
            .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(&*payload))));

        match result {
            Ok(reply) => Outcome::Routed {
                version,
                reply,
                keep_alive: request.is_keep_alive(),
            },
            Err(err) => Outcome::Failed(version, err.into()),
        }
    }

    #[inline]
    async fn fill_buffer<S>(&mut self, stream: &mut S) -> Result<usize, io::Error>
    where
        S: AsyncRead + Unpin,
    {
        let time = self.context.conn_limits.socket_read_timeout;

        tokio::select! {
            biased;

            read_result = stream.read(&mut self.buffer) => read_result,
            _ = tokio::time::sleep(time) => {
                Err(io::Error::new(io::ErrorKind::TimedOut, "read timeout"))
            },
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub(crate) mod writer {
    use std::io;
    use tokio::{
        io::{AsyncWrite, AsyncWriteExt},
        time::{timeout, Duration},
    };

    #[inline]
    pub(crate) async fn write_bytes<S>(
        stream: &mut S,
        response: &[u8],
        time: Duration,
    ) -> Result<(), io::Error>
    where
        S: AsyncWrite + Unpin,
    {
        timeout(time, async {
            stream.write_all(response).await?;
            stream.flush().await
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        http::router::Router,
        limits::{ConnLimits, RespLimits, ServerLimits},
        StatusCode,
    };
    use std::{str::from_utf8, time::Duration};
    use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

    fn context(router: Router, min_request_interval: Duration) -> Arc<ServerContext> {
        Arc::new(ServerContext::new(
            router,
            ServerLimits {
                min_request_interval,
                ..ServerLimits::default()
            },
            ConnLimits {
                socket_read_timeout: Duration::from_secs(2),
                ..ConnLimits::default()
            },
            RespLimits::default(),
        ))
    }

    fn router() -> Router {
        let mut router = Router::new();
        router
            .add_route(Method::Get, "/hello", |_, _| "Hello")
            .add_route(Method::Post, "/items", |path: &str, body: &str| {
                Reply::created(format!("{path} {body}"))
            })
            .add_route(Method::Get, "/fail", |_, _| -> Result<String, &'static str> {
                Err("backend down")
            })
            .add_route(Method::Get, "/panic", |_, _| -> String { panic!("handler bug") });
        router
    }

    impl HttpConnection {
        fn from_req<V: AsRef<[u8]>>(context: Arc<ServerContext>, value: V) -> (Self, usize) {
            let mut conn = HttpConnection::new(context);
            let value = value.as_ref();
            conn.buffer[..value.len()].copy_from_slice(value);
            (conn, value.len())
        }
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    async fn exchange(client: &mut DuplexStream, request: &str) -> String {
        client.write_all(request.as_bytes()).await.unwrap();

        let mut buf = vec![0; 1024];
        let n = client.read(&mut buf).await.unwrap();
        String::from_utf8(buf[..n].to_vec()).unwrap()
    }

    #[test]
    fn dispatch_outcomes() {
        let ctx = context(router(), Duration::ZERO);

        #[rustfmt::skip]
        let cases = vec![
            (
                "GET /hello HTTP/1.1\r\n\r\n",
                Outcome::Routed { version: Version::Http11, reply: Reply::ok("Hello"), keep_alive: true },
            ),
            (
                "GET /hello HTTP/1.0\r\n\r\n",
                Outcome::Routed { version: Version::Http10, reply: Reply::ok("Hello"), keep_alive: false },
            ),
            (
                "GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n",
                Outcome::Routed { version: Version::Http11, reply: Reply::ok("Hello"), keep_alive: false },
            ),
            (
                "POST /items HTTP/1.1\r\n\r\npayload",
                Outcome::Routed {
                    version: Version::Http11,
                    reply: Reply::with_status(StatusCode::Created, "/items payload"),
                    keep_alive: true,
                },
            ),
            ("GET /missing HTTP/1.1\r\n\r\n", Outcome::NotFound(Version::Http11)),
            ("DELETE /hello HTTP/1.0\r\n\r\n", Outcome::NotFound(Version::Http10)),
            (
                "FOO /x HTTP/1.1\r\n\r\n",
                Outcome::Failed(Version::Http11, DispatchError::UnknownMethod("FOO".into())),
            ),
            (
                "get /hello HTTP/1.1\r\n\r\n",
                Outcome::Failed(Version::Http11, DispatchError::UnknownMethod("get".into())),
            ),
            (
                "GET /fail HTTP/1.1\r\n\r\n",
                Outcome::Failed(
                    Version::Http11,
                    DispatchError::Handler(HandlerError::Failed("backend down".into())),
                ),
            ),
            (
                "GET /panic HTTP/1.1\r\n\r\n",
                Outcome::Failed(
                    Version::Http11,
                    DispatchError::Handler(HandlerError::Panicked("handler bug".into())),
                ),
            ),
        ];

        for (raw, expected) in cases {
            let (conn, len) = HttpConnection::from_req(ctx.clone(), raw);
            assert_eq!(conn.dispatch(len), expected, "{raw:?}");
        }
    }

    #[test]
    fn dispatch_invalid_utf8() {
        let ctx = context(router(), Duration::ZERO);
        let (conn, len) = HttpConnection::from_req(ctx, b"GET /\xff HTTP/1.1\r\n\r\n");

        assert_eq!(
            conn.dispatch(len),
            Outcome::Failed(Version::Http11, DispatchError::InvalidEncoding)
        );
    }

    #[tokio::test]
    async fn hello_round_trip() {
        let ctx = context(router(), Duration::ZERO);
        let (mut client, mut server) = duplex(4096);

        let task = tokio::spawn(async move {
            HttpConnection::new(ctx).run(&mut server, peer()).await
        });

        let resp = exchange(&mut client, "GET /hello HTTP/1.1\r\n\r\n").await;
        assert_eq!(
            resp,
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 5\r\nConnection: keep-alive\r\n\r\nHello"
        );

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn loop_survives_errors() {
        let ctx = context(router(), Duration::ZERO);
        let (mut client, mut server) = duplex(4096);

        let task = tokio::spawn(async move {
            HttpConnection::new(ctx).run(&mut server, peer()).await
        });

        let resp = exchange(&mut client, "FOO /x HTTP/1.1\r\n\r\n").await;
        assert!(resp.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{resp}");

        let resp = exchange(&mut client, "GET /nowhere HTTP/1.1\r\n\r\n").await;
        assert!(resp.starts_with("HTTP/1.1 404 Not Found\r\n"), "{resp}");
        assert!(resp.ends_with("Route not found"));

        let resp = exchange(&mut client, "GET /panic HTTP/1.1\r\n\r\n").await;
        assert!(resp.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{resp}");

        // `Connection: close` only labels the response; the loop keeps reading
        let resp = exchange(&mut client, "GET /hello HTTP/1.1\r\nConnection: close\r\n\r\n").await;
        assert!(resp.contains("Connection: close\r\n"), "{resp}");

        let resp = exchange(&mut client, "POST /items HTTP/1.0\r\n\r\nx").await;
        assert!(resp.starts_with("HTTP/1.0 201 Created\r\n"), "{resp}");
        assert!(resp.ends_with("/items x"));

        drop(client);
        task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn rate_limited_connection_gets_429_and_closes() {
        let ctx = context(router(), Duration::from_secs(60));

        // First connection from the address is admitted
        let (mut client, mut server) = duplex(4096);
        let first = tokio::spawn({
            let ctx = ctx.clone();
            async move { HttpConnection::new(ctx).run(&mut server, peer()).await }
        });
        let resp = exchange(&mut client, "GET /hello HTTP/1.1\r\n\r\n").await;
        assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));
        drop(client);
        first.await.unwrap().unwrap();

        // Second one, too soon
        let (mut client, mut server) = duplex(4096);
        HttpConnection::new(ctx.clone())
            .run(&mut server, peer())
            .await
            .unwrap();
        drop(server);

        let mut resp = Vec::new();
        client.read_to_end(&mut resp).await.unwrap();
        let resp = from_utf8(&resp).unwrap();
        assert!(resp.starts_with("HTTP/1.1 429 Too Many Requests\r\n"), "{resp}");
        assert!(resp.contains("Connection: close\r\n"));

        // A different address is unaffected
        assert!(!ctx.rate_limiter.too_many_requests("127.0.0.2"));
    }

    #[tokio::test]
    async fn idle_connection_times_out() {
        let ctx = Arc::new(ServerContext::new(
            router(),
            ServerLimits {
                min_request_interval: Duration::ZERO,
                ..ServerLimits::default()
            },
            ConnLimits {
                socket_read_timeout: Duration::from_millis(30),
                ..ConnLimits::default()
            },
            RespLimits::default(),
        ));
        let (_client, mut server) = duplex(4096);

        let err = HttpConnection::new(ctx)
            .run(&mut server, peer())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
