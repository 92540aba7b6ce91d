/**
 * chatrelay Server Entry Point
 *
 * Loads configuration, builds the application and serves it until Ctrl-C or
 * SIGTERM, then shuts sessions down and releases the backend identity.
 */

use std::time::Duration;

use chatrelay::backend::server::create_app;
use chatrelay::shared::AppConfig;
use tokio_util::sync::CancellationToken;

/// Bound on waiting for sessions and deliveries at shutdown.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let config = AppConfig::load()?;
    let port = config.http_port;

    let app = create_app(config).await?;

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        backend_id = %app.state.backend_id(),
        "Listening on {}",
        addr
    );

    axum::serve(listener, app.routes.clone())
        .with_graceful_shutdown(shutdown_signal(app.state.shutdown.clone()))
        .await?;

    app.shutdown(SHUTDOWN_GRACE).await;
    Ok(())
}

/// Resolve on Ctrl-C or SIGTERM, cancelling `shutdown` so upgraded sessions
/// (which the HTTP server no longer tracks) end too.
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    shutdown.cancel();
}
