use std::net::SocketAddr;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use chirpy_api::auth::AppStateInner;
use chirpy_api::config::AppConfig;
use chirpy_api::routes;
use chirpy_db::Database;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chirpy_server=debug,chirpy_api=debug,chirpy_db=debug,tower_http=debug".into()
            }),
        )
        .init();

    // Config
    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("FATAL: {}", e);
            eprintln!("       Set CHIRPY_JWT_SECRET in your .env file and restart.");
            std::process::exit(1);
        }
    };
    if config.polka_key.is_none() {
        info!("CHIRPY_POLKA_KEY unset; upgrade webhook accepts unauthenticated calls");
    }

    // Init store
    let db = Database::open(&config.db_path)?;

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let static_dir = config.static_dir.clone();
    let state = AppStateInner::new(db, config);

    let app = routes::app(state, &static_dir)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    info!("Serving files from {} at /app", static_dir.display());
    info!("Chirpy server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
