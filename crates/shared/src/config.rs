//! Application configuration management.

use serde::Deserialize;

/// Application configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    pub server: ServerConfig,
    /// Database configuration.
    pub database: DatabaseConfig,
    /// JWT configuration.
    pub jwt: JwtSettings,
    /// Receipt/report storage configuration.
    #[serde(default)]
    pub storage: StorageSettings,
    /// AMLO reporting configuration.
    #[serde(default)]
    pub amlo: AmloSettings,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Database connection URL.
    pub url: String,
    /// Maximum number of connections in the pool.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Minimum number of connections in the pool.
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,
}

fn default_max_connections() -> u32 {
    10
}

fn default_min_connections() -> u32 {
    1
}

/// JWT configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct JwtSettings {
    /// Secret key for verifying tokens.
    pub secret: String,
    /// Access token expiration in seconds.
    #[serde(default = "default_access_token_expiry")]
    pub access_token_expiry_secs: u64,
}

fn default_access_token_expiry() -> u64 {
    900 // 15 minutes
}

/// Receipt/report storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    /// Directory containing the `receipts/` and `reports/` trees.
    #[serde(default = "default_data_root")]
    pub data_root: String,
    /// Directory holding AMLO PDF templates and field-map CSVs.
    #[serde(default = "default_templates_root")]
    pub templates_root: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            data_root: default_data_root(),
            templates_root: default_templates_root(),
        }
    }
}

fn default_data_root() -> String {
    "data".to_string()
}

fn default_templates_root() -> String {
    "templates".to_string()
}

/// AMLO reporting configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct AmloSettings {
    /// Three-digit institution code printed into report numbers.
    #[serde(default = "default_institution_code")]
    pub institution_code: String,
}

impl Default for AmloSettings {
    fn default() -> Self {
        Self {
            institution_code: default_institution_code(),
        }
    }
}

fn default_institution_code() -> String {
    "015".to_string()
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// Layered sources, later overrides earlier:
    /// 1. `config/default.toml`
    /// 2. `config/{LOG_MODE}.toml` (production or development)
    /// 3. `SATANG__`-prefixed environment variables
    /// 4. `PORT` and `DATABASE_URL` shortcuts
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("LOG_MODE").unwrap_or_else(|_| "development".to_string());

        let mut builder = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(config::Environment::with_prefix("SATANG").separator("__"));

        if let Ok(port) = std::env::var("PORT") {
            builder = builder.set_override("server.port", port)?;
        }
        if let Ok(url) = std::env::var("DATABASE_URL") {
            builder = builder.set_override("database.url", url)?;
        }

        builder.build()?.try_deserialize()
    }

    /// Returns true when `INIT_DB=true` requests migrate-on-boot.
    #[must_use]
    pub fn init_db_requested() -> bool {
        std::env::var("INIT_DB").is_ok_and(|v| v.eq_ignore_ascii_case("true"))
    }

    /// Returns true when `LOG_MODE=production` requests JSON log output.
    #[must_use]
    pub fn production_logging() -> bool {
        std::env::var("LOG_MODE").is_ok_and(|v| v.eq_ignore_ascii_case("production"))
    }
}
