//! Back-office API configuration module.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`BORKA__SERVER__PORT=9000`)
//! 2. Config file (`config/borka.toml`, optional)
//! 3. Defaults (this file)
//!
//! The database path defaults to the platform data directory
//! (`~/.local/share/borka-pos/borka.db` on Linux).

use std::net::SocketAddr;
use std::path::PathBuf;

use borka_core::validation::validate_tax_rate_bps;
use borka_core::LoyaltyProgram;
use borka_db::SaleSettings;
use config::{Config, Environment, File};
use directories::ProjectDirs;
use serde::Deserialize;

/// Back-office API configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub store: StoreConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file; `None` means the platform data directory.
    pub path: Option<PathBuf>,
    pub max_connections: u32,
}

/// Shop-wide pricing settings.
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    /// e.g. 500 = 5%
    pub tax_rate_bps: u32,
    pub points_per_100_taka: i64,
}

impl ApiConfig {
    /// Loads `config/borka.toml` (if present) and `BORKA__*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 8080)?
            .set_default("database.max_connections", 5)?
            .set_default("store.tax_rate_bps", 0)?
            .set_default("store.points_per_100_taka", 1)?
            .add_source(File::with_name("config/borka").required(false))
            .add_source(
                Environment::with_prefix("BORKA")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: ApiConfig = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_tax_rate_bps(self.store.tax_rate_bps)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        if self.store.points_per_100_taka < 0 {
            return Err(ConfigError::InvalidValue(
                "store.points_per_100_taka must not be negative".to_string(),
            ));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "database.max_connections must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|_| ConfigError::InvalidValue("server.host".to_string()))
    }

    /// Configured database file, or `borka.db` in the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        if let Some(path) = &self.database.path {
            return path.clone();
        }

        ProjectDirs::from("com", "borka", "borka-pos")
            .map(|dirs| dirs.data_dir().join("borka.db"))
            .unwrap_or_else(|| PathBuf::from("borka.db"))
    }

    pub fn sale_settings(&self) -> SaleSettings {
        SaleSettings {
            tax_rate_bps: self.store.tax_rate_bps,
            loyalty: LoyaltyProgram {
                points_per_100_taka: self.store.points_per_100_taka,
            },
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ApiConfig {
        ApiConfig {
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 8080,
            },
            database: DatabaseConfig {
                path: Some(PathBuf::from("/tmp/borka.db")),
                max_connections: 5,
            },
            store: StoreConfig {
                tax_rate_bps: 500,
                points_per_100_taka: 2,
            },
        }
    }

    #[test]
    fn test_defaults_load() {
        let config = ApiConfig::load().unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.database.max_connections, 5);
        assert_eq!(config.store.points_per_100_taka, 1);
        assert!(config.database_path().ends_with("borka.db"));
    }

    #[test]
    fn test_derived_values() {
        let config = sample();
        assert_eq!(config.bind_addr().unwrap().port(), 8080);
        assert_eq!(config.database_path(), PathBuf::from("/tmp/borka.db"));

        let settings = config.sale_settings();
        assert_eq!(settings.tax_rate_bps, 500);
        assert_eq!(settings.loyalty.points_per_100_taka, 2);
    }

    #[test]
    fn test_invalid_values_fail() {
        let mut config = sample();
        config.store.tax_rate_bps = 20_000;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidValue(_))));

        let mut config = sample();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());

        let mut config = sample();
        config.server.host = "not a host".into();
        assert!(config.bind_addr().is_err());
    }
}
