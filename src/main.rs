use sqlx::mysql::MySqlPoolOptions;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sehra_server::core::{AppState, Config, StorageKind};
use sehra_server::{create_router, monitoring};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Logging strutturato, filtrabile con RUST_LOG
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // Carica la configurazione da .env / variabili d'ambiente
    let config = Config::from_env()?;

    // Costruisce lo stato con il backend di storage selezionato
    let state = match config.storage {
        StorageKind::MySql => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or("DATABASE_URL must be set when STORAGE=mysql")?;
            let pool = MySqlPoolOptions::new()
                .max_connections(config.max_connections)
                .connect(database_url)
                .await?;
            info!("Connected to MySQL");
            AppState::with_mysql(pool, config.jwt_secret.clone())
        }
        StorageKind::Memory => {
            info!("Using in-memory storage (volatile)");
            AppState::in_memory(config.jwt_secret.clone())
        }
    };
    let state = Arc::new(state);

    // Sampler CPU/memoria del processo, solo telemetria
    tokio::spawn(monitoring::run_process_monitor(
        monitoring::MonitorConfig::default(),
    ));

    let app = create_router(state).layer(CorsLayer::permissive());

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
