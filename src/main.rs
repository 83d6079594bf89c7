use clap::Parser;
use pool_web::{limits::ServerLimits, Method, Reply, Router, Server, ServerError};
use std::time::Duration;
use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "pool_web")]
#[command(about = "Worker-pool HTTP server with exact-match routes", long_about = None)]
struct Cli {
    /// Port to listen on; repeat to run one server per port
    #[arg(short, long = "port", default_values_t = [4222, 4444])]
    ports: Vec<u16>,

    /// Workers per server
    #[arg(short, long, default_value_t = 8)]
    workers: usize,

    /// Minimum time between connections from one address, in milliseconds (0 disables)
    #[arg(long, default_value_t = 100)]
    min_interval_ms: u64,

    /// Reject connections with 503 once this many are waiting for a worker
    #[arg(long)]
    max_pending: Option<usize>,
}

fn echo_get(path: &str, body: &str) -> String {
    format!("GET: {path}\n{body}")
}

fn echo_post(path: &str, body: &str) -> Reply {
    Reply::created(format!("POST Body: {body}\r\n{path}"))
}

fn echo_put(path: &str, body: &str) -> String {
    format!("PUT: {path}\n{body}")
}

fn echo_delete(path: &str, body: &str) -> String {
    format!("DELETE: {path}\r\n{body}")
}

fn demo_router(port: u16) -> Router {
    let hello = format!("Hello from port {port}!");
    let goodbye = format!("Goodbye from port {port}!");

    let mut router = Router::new();
    router
        .add_route(Method::Get, "/hello", move |_, _| hello.clone())
        .add_route(Method::Put, "/goodbye", move |_, _| goodbye.clone())
        .add_route(Method::Get, "/echo", echo_get)
        .add_route(Method::Post, "/echo", echo_post)
        .add_route(Method::Put, "/echo", echo_put)
        .add_route(Method::Delete, "/echo", echo_delete);
    router
}

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pool_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let limits = ServerLimits {
        worker_count: cli.workers.max(1),
        max_pending_connections: cli.max_pending,
        min_request_interval: Duration::from_millis(cli.min_interval_ms),
        ..ServerLimits::default()
    };

    // Bind everything first, so a taken port fails before anything is served
    let mut servers = Vec::with_capacity(cli.ports.len());
    for &port in &cli.ports {
        let router = demo_router(port);
        for (method, path) in router.routes() {
            tracing::info!(port, %method, path, "route registered");
        }

        let server = Server::builder()
            .port(port)
            .router(router)
            .server_limits(limits.clone())
            .build()?;
        servers.push(server);
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let running: Vec<_> = servers
        .into_iter()
        .map(|server| {
            let mut shutdown = shutdown_rx.clone();
            tokio::spawn(server.launch_until(async move {
                let _ = shutdown.changed().await;
            }))
        })
        .collect();

    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Ctrl-C received, shutting down"),
        Err(err) => tracing::error!(error = %err, "cannot listen for Ctrl-C, shutting down"),
    }
    let _ = shutdown_tx.send(true);

    for server in running {
        if let Err(err) = server.await {
            tracing::error!(error = %err, "server task failed");
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults() {
        let cli = Cli::parse_from(["pool_web"]);

        assert_eq!(cli.ports, vec![4222, 4444]);
        assert_eq!(cli.workers, 8);
        assert_eq!(cli.min_interval_ms, 100);
        assert_eq!(cli.max_pending, None);
    }

    #[test]
    fn cli_repeated_ports() {
        let cli = Cli::parse_from([
            "pool_web", "--port", "8080", "-p", "8081", "--min-interval-ms", "0", "--max-pending", "64",
        ]);

        assert_eq!(cli.ports, vec![8080, 8081]);
        assert_eq!(cli.min_interval_ms, 0);
        assert_eq!(cli.max_pending, Some(64));
    }

    #[test]
    fn demo_routes() {
        let router = demo_router(4222);
        assert_eq!(router.len(), 6);

        let hello = router.get_handler(Method::Get, "/hello").unwrap();
        assert_eq!(hello("/hello", "").unwrap(), Reply::ok("Hello from port 4222!"));

        let post = router.get_handler(Method::Post, "/echo").unwrap();
        assert_eq!(post("/echo", "abc").unwrap(), Reply::created("POST Body: abc\r\n/echo"));

        assert!(router.get_handler(Method::Delete, "/hello").is_none());
    }
}
