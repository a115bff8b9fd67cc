use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

const DEFAULT_DOCUMENT_MAX_BYTES: usize = 10 * 1024 * 1024;
const DEFAULT_DOCUMENT_URL_TTL_SECS: i64 = 60 * 60 * 24;
const DEFAULT_OFFER_VALIDITY_DAYS: i64 = 30;
const DEFAULT_STORAGE_BASE_URL: &str = "http://localhost:3000/storage";

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub marketplace: MarketplaceConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let marketplace = MarketplaceConfig {
            document_max_bytes: parse_positive("MARKETPLACE_DOCUMENT_MAX_BYTES")?
                .map(|value| value as usize)
                .unwrap_or(DEFAULT_DOCUMENT_MAX_BYTES),
            document_url_ttl_secs: parse_positive("MARKETPLACE_DOCUMENT_URL_TTL_SECS")?
                .unwrap_or(DEFAULT_DOCUMENT_URL_TTL_SECS),
            default_offer_validity_days: parse_positive("MARKETPLACE_DEFAULT_OFFER_VALIDITY_DAYS")?
                .unwrap_or(DEFAULT_OFFER_VALIDITY_DAYS),
            storage_base_url: env::var("MARKETPLACE_STORAGE_BASE_URL")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| DEFAULT_STORAGE_BASE_URL.to_string()),
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                include_targets: environment != AppEnvironment::Production,
                ansi: environment == AppEnvironment::Development,
            },
            marketplace,
        })
    }
}

fn parse_positive(key: &'static str) -> Result<Option<i64>, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(value) if value > 0 => Ok(Some(value)),
            _ => Err(ConfigError::InvalidNumber { key, value: raw }),
        },
        Err(_) => Ok(None),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
    pub include_targets: bool,
    pub ansi: bool,
}

/// Limits and defaults for lead documents and bank offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketplaceConfig {
    pub document_max_bytes: usize,
    pub document_url_ttl_secs: i64,
    pub default_offer_validity_days: i64,
    pub storage_base_url: String,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            document_max_bytes: DEFAULT_DOCUMENT_MAX_BYTES,
            document_url_ttl_secs: DEFAULT_DOCUMENT_URL_TTL_SECS,
            default_offer_validity_days: DEFAULT_OFFER_VALIDITY_DAYS,
            storage_base_url: DEFAULT_STORAGE_BASE_URL.to_string(),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber { key, value } => {
                write!(f, "{key} must be a positive integer (found '{value}')")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidNumber { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
