use std::future::IntoFuture;
use std::net::SocketAddr;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use iotgw_api::config::{self, ServerConfig};
use iotgw_api::router::{build_data_router, build_live_router};
use iotgw_api::state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "iotgw_api=debug,iotgw_core=info,iotgw_events=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(
        host = %config.host,
        data_port = config.data_port,
        ui_port = config.ui_port,
        api_key = config.api_key.is_some(),
        "Loaded server configuration"
    );

    let rules = config::load_rules(&config.rules_path).expect("Failed to load anomaly rules");
    tracing::info!(path = %config.rules_path.display(), rules = rules.len(), "Anomaly rules loaded");

    // --- App state (spawns the broadcast hub) ---
    let state = AppState::new(config.clone(), rules);

    // --- Routers ---
    let hub = state.hub.clone();
    let data_app = build_data_router(state.clone(), &config);
    let live_app = build_live_router(state, &config);

    // --- Listeners ---
    let ip = config.host.parse().expect("Invalid HOST address");
    let data_addr = SocketAddr::new(ip, config.data_port);
    let live_addr = SocketAddr::new(ip, config.ui_port);

    let data_listener = tokio::net::TcpListener::bind(data_addr)
        .await
        .expect("Failed to bind ingestion listener");
    let live_listener = tokio::net::TcpListener::bind(live_addr)
        .await
        .expect("Failed to bind live-feed listener");
    tracing::info!(%data_addr, %live_addr, "Starting servers");

    // --- Shutdown ---
    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
            hub.close_all();
        }
    });

    let data_server = axum::serve(data_listener, data_app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned());
    let live_server = axum::serve(live_listener, live_app)
        .with_graceful_shutdown(shutdown.clone().cancelled_owned());

    let (data_result, live_result) =
        tokio::join!(data_server.into_future(), live_server.into_future());

    if let Err(e) = data_result {
        tracing::error!(error = %e, "Ingestion server error");
    }
    if let Err(e) = live_result {
        tracing::error!(error = %e, "Live-feed server error");
    }

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
