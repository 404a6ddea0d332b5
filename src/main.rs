use std::{net::SocketAddr, sync::Arc};

use mongodb::Client;
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;

use warframe_utils::{
    config::{self, StoreBackend},
    routes,
    services::{alert_monitor::AlertMonitor, db_init},
    store::{AlertStore, MemoryAlertStore, MongoAlertStore},
    AppState,
};

async fn open_store(settings: &config::Settings) -> Result<Arc<dyn AlertStore>, mongodb::error::Error> {
    match settings.store_backend {
        StoreBackend::Memory => {
            tracing::warn!("using in-memory alert store; data is lost on restart");
            Ok(Arc::new(MemoryAlertStore::new()))
        }
        StoreBackend::Mongo => {
            let client = Client::with_uri_str(&settings.mongodb_uri).await?;
            let store = MongoAlertStore::new(client, &settings.mongodb_db, settings.mongodb_transactions);

            if let Err(e) = db_init::ensure_indexes(store.database()).await {
                tracing::error!(error = %e, "failed to ensure indexes");
            }

            Ok(Arc::new(store))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let settings = config::load();

    let store = open_store(&settings).await?;
    let state = AppState::build(settings.clone(), store)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let monitor = AlertMonitor::from_state(&state).spawn(shutdown_rx);

    let app = routes::app(state);

    let ip = settings.host.parse::<std::net::IpAddr>()?;
    let addr = SocketAddr::from((ip, settings.port));
    tracing::info!("listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = monitor.await {
        tracing::error!(error = %e, "alert monitor task ended abnormally");
    }

    Ok(())
}
