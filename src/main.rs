use dotenvy::dotenv;
use envconfig::Envconfig;
use tokio::net::TcpListener;

use hospital_admin::config::Config;
use hospital_admin::db::init_db;
use hospital_admin::router::{build_router, AppState};
use hospital_admin::services::accounts::ensure_bootstrap_admin;

type Error = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Initialize the logger with default settings or "info" level if not specified
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    log::info!("Starting the hospital admin service...");

    // Load environment variables from a .env file if present
    dotenv().ok();

    let config = Config::init_from_env().map_err(|e| format!("Invalid configuration: {e}"))?;

    let pool = init_db(&config.database_url, config.db_max_connections).await?;
    log::info!("Database ready at {}", config.database_url);

    match config.bootstrap_admin_password.as_deref() {
        Some(password) => {
            ensure_bootstrap_admin(
                &pool,
                &config.bootstrap_admin_username,
                password,
                config.password_hash_iterations,
            )
            .await?;
        }
        None => log::info!("BOOTSTRAP_ADMIN_PASSWORD not set; skipping admin bootstrap"),
    }

    let app = build_router(AppState {
        pool: pool.clone(),
        session_ttl: config.session_ttl(),
        hash_iterations: config.password_hash_iterations,
    });

    let listener = TcpListener::bind(&config.bind_addr).await?;
    log::info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;

    log::info!("Shutting down gracefully");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl+C: {}", e);
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
                log::error!("Failed to listen for SIGTERM: {}", e);
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
}
