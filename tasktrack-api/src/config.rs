/// Configuration for the API server
///
/// Loaded from environment variables (a `.env` file is read first when
/// present).
///
/// # Environment Variables
///
/// - `API_HOST` / `API_PORT`: bind address (default `0.0.0.0:8080`)
/// - `DATABASE_URL`: PostgreSQL connection string, or `memory` (required)
/// - `DATABASE_MAX_CONNECTIONS`: pool size (default 10)
/// - `JWT_SECRET`: HS256 signing key, at least 32 characters (required)
/// - `ACCESS_TOKEN_LIFETIME_MINUTES`: default 60
/// - `REFRESH_TOKEN_LIFETIME_HOURS`: default 24
/// - `TIME_ZONE`: IANA zone used by date filters (default `UTC`)
/// - `PAGE_SIZE`: list page size (default 10)
/// - `CORS_ORIGINS`: comma-separated origins, `*` for any (default `*`)
/// - `PRODUCTION`: enables HSTS (default false)
/// - `LOG_FORMAT`: `pretty` or `json` (default `pretty`)
///
/// # Example
///
/// ```no_run
/// use tasktrack_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use chrono_tz::Tz;
use std::env;
use std::str::FromStr;
use tasktrack_shared::auth::jwt::TokenLifetimes;

/// `DATABASE_URL` value selecting the in-memory store
pub const MEMORY_DATABASE_URL: &str = "memory";

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub api: ApiConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub listing: ListingConfig,
    pub log_format: LogFormat,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins; `*` allows any
    pub cors_origins: Vec<String>,

    /// Production mode (HSTS on)
    pub production: bool,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL, or [`MEMORY_DATABASE_URL`]
    pub url: String,

    pub max_connections: u32,
}

#[derive(Debug, Clone)]
pub struct JwtConfig {
    /// Secret key for JWT signing
    ///
    /// Must be at least 32 bytes. Generate with `openssl rand -hex 32`.
    pub secret: String,

    pub access_lifetime_minutes: i64,
    pub refresh_lifetime_hours: i64,
}

/// List endpoint settings
#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub page_size: u32,

    /// Zone in which calendar dates of date filters are interpreted
    pub time_zone: Tz,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => anyhow::bail!("LOG_FORMAT must be 'pretty' or 'json', got '{other}'"),
        }
    }
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_bool(name: &str, value: &str) -> anyhow::Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => anyhow::bail!("{name} must be a boolean, got '{other}'"),
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `DATABASE_URL` or `JWT_SECRET` is missing
    /// - `JWT_SECRET` is shorter than 32 characters
    /// - a numeric, boolean or time zone variable cannot be parsed
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let api_host = var_or("API_HOST", "0.0.0.0");
        let api_port = var_or("API_PORT", "8080").parse::<u16>()?;
        let cors_origins = var_or("CORS_ORIGINS", "*")
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();
        let production = parse_bool("PRODUCTION", &var_or("PRODUCTION", "false"))?;

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;
        let max_connections = var_or("DATABASE_MAX_CONNECTIONS", "10").parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;
        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }
        let access_lifetime_minutes = var_or("ACCESS_TOKEN_LIFETIME_MINUTES", "60").parse::<i64>()?;
        let refresh_lifetime_hours = var_or("REFRESH_TOKEN_LIFETIME_HOURS", "24").parse::<i64>()?;
        if access_lifetime_minutes <= 0 || refresh_lifetime_hours <= 0 {
            anyhow::bail!("Token lifetimes must be positive");
        }

        let page_size = var_or("PAGE_SIZE", "10").parse::<u32>()?;
        if page_size == 0 {
            anyhow::bail!("PAGE_SIZE must be at least 1");
        }
        let time_zone_name = var_or("TIME_ZONE", "UTC");
        let time_zone = time_zone_name
            .parse::<Tz>()
            .map_err(|e| anyhow::anyhow!("Invalid TIME_ZONE '{time_zone_name}': {e}"))?;

        let log_format = var_or("LOG_FORMAT", "pretty").parse::<LogFormat>()?;

        Ok(Self {
            api: ApiConfig {
                host: api_host,
                port: api_port,
                cors_origins,
                production,
            },
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            jwt: JwtConfig {
                secret: jwt_secret,
                access_lifetime_minutes,
                refresh_lifetime_hours,
            },
            listing: ListingConfig {
                page_size,
                time_zone,
            },
            log_format,
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }

    /// True when `DATABASE_URL` selects the in-memory store
    pub fn is_memory_store(&self) -> bool {
        self.database.url.eq_ignore_ascii_case(MEMORY_DATABASE_URL)
    }

    pub fn token_lifetimes(&self) -> TokenLifetimes {
        TokenLifetimes {
            access: Duration::minutes(self.jwt.access_lifetime_minutes),
            refresh: Duration::hours(self.jwt.refresh_lifetime_hours),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                cors_origins: vec!["*".to_string()],
                production: false,
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/test".to_string(),
                max_connections: 10,
            },
            jwt: JwtConfig {
                secret: "test-secret-key-at-least-32-bytes-long".to_string(),
                access_lifetime_minutes: 60,
                refresh_lifetime_hours: 24,
            },
            listing: ListingConfig {
                page_size: 10,
                time_zone: chrono_tz::UTC,
            },
            log_format: LogFormat::Pretty,
        }
    }

    #[test]
    fn test_bind_address() {
        assert_eq!(config().bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_memory_store_selection() {
        let mut config = config();
        assert!(!config.is_memory_store());

        config.database.url = "MEMORY".to_string();
        assert!(config.is_memory_store());
    }

    #[test]
    fn test_token_lifetimes_default_to_one_hour_and_one_day() {
        assert_eq!(config().token_lifetimes(), TokenLifetimes::default());
    }

    #[test]
    fn test_log_format_parsing() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("pretty".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("PRODUCTION", "TRUE").unwrap());
        assert!(!parse_bool("PRODUCTION", "0").unwrap());
        assert!(parse_bool("PRODUCTION", "maybe").is_err());
    }
}
