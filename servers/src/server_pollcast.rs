use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::signal;

use lib_pollcast::configs::load_config;
use lib_pollcast::core::{CacheWriter, Dispatcher};
use lib_pollcast::gateway::{self, AppState};
use lib_pollcast::ingestors::PollingIngestor;
use lib_pollcast::loggers::setup_logging;
use lib_pollcast::retrieve::HttpFetcher;

#[tokio::main]
async fn main() -> Result<()> {
    let config = load_config()?;
    setup_logging(&config.log_dir, &config.log_level, "server_pollcast")?;
    config.source.log();

    // --- Wiring ---
    let writer = CacheWriter::new();
    let dispatcher = Arc::new(Dispatcher::new(writer.reader()));
    let fetcher = HttpFetcher::new(&config.upstream_url, config.fetch_timeout, &config.user_agent)?;
    log::info!(
        "Polling {} every {:?} (timeout {:?})",
        fetcher.url(),
        config.poll_interval,
        config.fetch_timeout
    );
    let ingestor = PollingIngestor::new(fetcher, writer, Arc::clone(&dispatcher), config.poll_interval);

    let app_state = Arc::new(AppState {
        dispatcher,
        counters: ingestor.counters(),
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;

    let (shutdown_tx, _) = tokio::sync::broadcast::channel(1);

    let upstream_rx = shutdown_tx.subscribe();
    let upstream_handle = tokio::spawn(async move { ingestor.run(upstream_rx).await });

    let downstream_handle = tokio::spawn(gateway::serve(listener, app_state, shutdown_tx.subscribe()));

    // Wait for shutdown signal
    tokio::select! {
        _ = signal::ctrl_c() => {
            log::info!("Ctrl-C received, initiating shutdown.");
        }
        _ = terminate() => {
            log::info!("SIGTERM received, initiating shutdown.");
        }
    }

    // Send shutdown signal to all components
    let _ = shutdown_tx.send(());

    let (_, served) = tokio::try_join!(upstream_handle, downstream_handle)?;
    if let Err(e) = served {
        log::error!("Downstream server stopped with error: {}", e);
    }

    log::info!("Shutdown complete.");
    Ok(())
}

#[cfg(unix)]
async fn terminate() {
    match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(mut term_signal) => {
            term_signal.recv().await;
        }
        Err(e) => {
            log::warn!("Cannot listen for SIGTERM: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    // On non-unix platforms, just wait forever.
    std::future::pending::<()>().await;
}
