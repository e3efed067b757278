//! Configuration - Caricamento configurazione da variabili d'ambiente

use dotenv::dotenv;
use std::env;

/// Backend di persistenza selezionato a runtime
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageKind {
    /// MySQL via sqlx, richiede DATABASE_URL
    MySql,
    /// Backend volatile, utile per demo e test senza database
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageKind,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_connections: u32,
    pub app_env: String,
}

impl Config {
    /// Carica la configurazione dalle variabili d'ambiente
    /// Chiama dotenv() automaticamente
    pub fn from_env() -> Result<Self, String> {
        dotenv().ok();

        let storage = match env::var("STORAGE")
            .unwrap_or_else(|_| "mysql".to_string())
            .to_lowercase()
            .as_str()
        {
            "mysql" => StorageKind::MySql,
            "memory" => StorageKind::Memory,
            other => return Err(format!("Invalid STORAGE value: {}", other)),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if storage == StorageKind::MySql && database_url.is_none() {
            return Err("DATABASE_URL must be set when STORAGE=mysql".to_string());
        }

        let jwt_secret = env::var("JWT_SECRET").unwrap_or_else(|_| {
            eprintln!("WARNING: JWT_SECRET not set, using default (not secure for production!)");
            "un segreto meno bello".to_string()
        });

        let server_host = env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let server_port = env::var("SERVER_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| "Invalid SERVER_PORT: must be a number between 0-65535".to_string())?;

        let max_connections = env::var("MAX_DB_CONNECTIONS")
            .unwrap_or_else(|_| "50".to_string())
            .parse::<u32>()
            .map_err(|_| "Invalid MAX_DB_CONNECTIONS: must be a positive number".to_string())?;

        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        Ok(Self {
            storage,
            database_url,
            jwt_secret,
            server_host,
            server_port,
            max_connections,
            app_env,
        })
    }
}
