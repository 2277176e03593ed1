use std::net::SocketAddr;
use swim_booking::{
    catalog::Catalog, remote::RemoteClient, router, sync::spawn_periodic_sync, AppState, Config,
};
use tokio::fs;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let config = Config::from_env();
    fs::create_dir_all(&config.data_dir).await?;

    let catalog = Catalog::load(config.events_path.as_deref()).await?;
    let remote = match config.remote_url.as_deref() {
        Some(url) => {
            info!(url, "forwarding bookings to remote endpoint");
            Some(RemoteClient::new(url, config.remote_timeout)?)
        }
        None => {
            info!("no remote endpoint configured; running on local data only");
            None
        }
    };

    let state = AppState::load(&config, catalog, remote).await;
    let _sync_task = spawn_periodic_sync(state.clone(), config.sync_interval);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutting down"),
        Err(err) => {
            tracing::error!("failed to listen for shutdown signal: {err}");
            std::future::pending::<()>().await;
        }
    }
}
