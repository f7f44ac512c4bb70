use std::env;
use std::net::SocketAddr;

use crate::error::AppError;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
}

impl AppConfig {
    /// Read settings from the environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let database_url =
            env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://krs.db".to_string());

        let bind_addr = env::var("BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:3000".to_string())
            .parse::<SocketAddr>()
            .map_err(|e| AppError::Config(format!("BIND_ADDR is not a socket address: {}", e)))?;

        let max_connections = match env::var("DB_MAX_CONNECTIONS") {
            Ok(raw) => raw.parse::<u32>().map_err(|e| {
                AppError::Config(format!("DB_MAX_CONNECTIONS is not a number: {}", e))
            })?,
            Err(_) => 5,
        };
        if max_connections == 0 {
            return Err(AppError::Config(
                "DB_MAX_CONNECTIONS must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            bind_addr,
            max_connections,
        })
    }
}
