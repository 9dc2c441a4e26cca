//! Configuration module for the Takween backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveTime;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key for API authentication (required in production)
    pub api_psk: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Path to Tantivy search index directory
    pub index_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Insert demo departments, employees and projects into an empty database
    pub seed_demo_data: bool,
    /// Endpoint of the text-generation service used for performance insights
    pub insight_url: Option<String>,
    /// Check-ins after this time of day are recorded as LATE
    pub late_after: NaiveTime,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_psk = env::var("TAKWEEN_API_PSK").ok().filter(|s| !s.is_empty());

        let db_path = env::var("TAKWEEN_DB_PATH")
            .unwrap_or_else(|_| "./data/takween.sqlite".to_string())
            .into();

        let index_path = env::var("TAKWEEN_INDEX_PATH")
            .unwrap_or_else(|_| "./data/index".to_string())
            .into();

        let bind_addr = env::var("TAKWEEN_BIND_ADDR")
            .ok()
            .and_then(|raw| match raw.parse() {
                Ok(addr) => Some(addr),
                Err(_) => {
                    tracing::warn!("Invalid TAKWEEN_BIND_ADDR {:?}, using default", raw);
                    None
                }
            })
            .unwrap_or_else(default_bind_addr);

        let log_level = env::var("TAKWEEN_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let seed_demo_data = env::var("TAKWEEN_SEED_DEMO")
            .map(|v| parse_flag(&v))
            .unwrap_or(true);

        let insight_url = env::var("TAKWEEN_INSIGHT_URL").ok().filter(|s| !s.is_empty());

        let late_after = env::var("TAKWEEN_LATE_AFTER")
            .ok()
            .and_then(|raw| match NaiveTime::parse_from_str(&raw, "%H:%M") {
                Ok(time) => Some(time),
                Err(_) => {
                    tracing::warn!("Invalid TAKWEEN_LATE_AFTER {:?}, using default", raw);
                    None
                }
            })
            .unwrap_or_else(default_late_after);

        Self {
            api_psk,
            db_path,
            index_path,
            bind_addr,
            log_level,
            seed_demo_data,
            insight_url,
            late_after,
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8080))
}

fn default_late_after() -> NaiveTime {
    NaiveTime::from_hms_opt(9, 15, 0).unwrap_or(NaiveTime::MIN)
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        env::remove_var("TAKWEEN_API_PSK");
        env::remove_var("TAKWEEN_DB_PATH");
        env::remove_var("TAKWEEN_INDEX_PATH");
        env::remove_var("TAKWEEN_BIND_ADDR");
        env::remove_var("TAKWEEN_LOG_LEVEL");
        env::remove_var("TAKWEEN_SEED_DEMO");
        env::remove_var("TAKWEEN_INSIGHT_URL");
        env::remove_var("TAKWEEN_LATE_AFTER");

        let config = Config::from_env();

        assert!(config.api_psk.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/takween.sqlite"));
        assert_eq!(config.index_path, PathBuf::from("./data/index"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert!(config.seed_demo_data);
        assert!(config.insight_url.is_none());
        assert_eq!(config.late_after.format("%H:%M").to_string(), "09:15");
    }

    #[test]
    fn test_parse_flag() {
        assert!(parse_flag("true"));
        assert!(parse_flag(" YES "));
        assert!(parse_flag("1"));
        assert!(!parse_flag("0"));
        assert!(!parse_flag("off"));
    }
}
