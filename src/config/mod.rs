use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub database: DatabaseConfig,
    pub ingestion: IngestionConfig,
    pub query: QueryConfig,
    pub api: ApiConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionConfig {
    /// Directory scanned for `*.csv` files (case-insensitive suffix)
    pub csv_dir: PathBuf,
    pub batch_size: usize,
    /// Run `init_ingestion_if_empty` when the server boots
    pub auto_ingest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub chart_max_rows: i64,
    pub default_items_per_page: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub jwt_secret: String,
    pub jwt_expiry_hours: u64,
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            csv_dir: PathBuf::from("csv-data"),
            batch_size: crate::srag::loader::DEFAULT_BATCH_SIZE,
            auto_ingest: true,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            chart_max_rows: crate::srag::chart::DEFAULT_CHART_MAX_ROWS,
            default_items_per_page: crate::srag::list::DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        override_from_env("DATABASE_MAX_CONNECTIONS", &mut self.database.max_connections);
        override_from_env("DATABASE_CONNECTION_TIMEOUT", &mut self.database.connection_timeout);

        override_from_env("INGESTION_CSV_DIR", &mut self.ingestion.csv_dir);
        override_from_env("INGESTION_BATCH_SIZE", &mut self.ingestion.batch_size);
        override_from_env("INGESTION_AUTO", &mut self.ingestion.auto_ingest);

        override_from_env("QUERY_CHART_MAX_ROWS", &mut self.query.chart_max_rows);
        override_from_env("QUERY_ITEMS_PER_PAGE", &mut self.query.default_items_per_page);

        // SRAG_API_PORT wins over the platform-provided PORT
        override_from_env("PORT", &mut self.api.port);
        override_from_env("SRAG_API_PORT", &mut self.api.port);
        override_from_env("API_ENABLE_REQUEST_LOGGING", &mut self.api.enable_request_logging);

        override_from_env("SECURITY_ENABLE_CORS", &mut self.security.enable_cors);
        override_from_env("JWT_SECRET", &mut self.security.jwt_secret);
        override_from_env("SECURITY_JWT_EXPIRY_HOURS", &mut self.security.jwt_expiry_hours);

        self
    }

    fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout: 30,
            },
            ingestion: IngestionConfig::default(),
            query: QueryConfig::default(),
            api: ApiConfig {
                port: 8080,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24 * 7, // 1 week
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout: 10,
            },
            ingestion: IngestionConfig::default(),
            query: QueryConfig::default(),
            api: ApiConfig {
                port: 8080,
                enable_request_logging: true,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 24,
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig {
                url: None,
                max_connections: 50,
                connection_timeout: 5,
            },
            // Bulk loading is an operator task in production (`srag ingest`)
            ingestion: IngestionConfig {
                auto_ingest: false,
                ..IngestionConfig::default()
            },
            query: QueryConfig::default(),
            api: ApiConfig {
                port: 8080,
                enable_request_logging: false,
            },
            security: SecurityConfig {
                enable_cors: true,
                jwt_secret: String::new(),
                jwt_expiry_hours: 4,
            },
        }
    }
}

/// Replace `target` when `key` is set and parses; bad values keep the preset
fn override_from_env<T: FromStr>(key: &str, target: &mut T) {
    let Ok(raw) = env::var(key) else { return };
    match raw.trim().parse() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!("Ignoring unparseable {}={:?}", key, raw),
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

// Convenience function for accessing config
pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[macro_export]
macro_rules! is_production {
    () => {
        matches!($crate::config::CONFIG.environment, $crate::config::Environment::Production)
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_development_config() {
        let config = AppConfig::development();
        assert!(config.ingestion.auto_ingest);
        assert_eq!(config.ingestion.batch_size, 1000);
        assert_eq!(config.query.chart_max_rows, 10_000);
        assert_eq!(config.ingestion.csv_dir, PathBuf::from("csv-data"));
    }

    #[test]
    fn test_default_production_config() {
        let config = AppConfig::production();
        assert!(!config.ingestion.auto_ingest);
        assert_eq!(config.query.default_items_per_page, 20);
        assert!(!config.api.enable_request_logging);
    }

    #[test]
    fn env_override_keeps_preset_on_bad_value() {
        let key = "SRAG_CONFIG_TEST_PORT";
        let mut port: u16 = 8080;

        env::set_var(key, "not-a-port");
        override_from_env(key, &mut port);
        assert_eq!(port, 8080);

        env::set_var(key, " 9090 ");
        override_from_env(key, &mut port);
        assert_eq!(port, 9090);
        env::remove_var(key);
    }
}
