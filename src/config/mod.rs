//! Configuration module for the board backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::search::MergeMode;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Upper bound for each search source query
    pub search_timeout: Duration,
    /// How the two search sources are paginated before merging
    pub search_merge: MergeMode,
    /// Page size used when a search request omits one
    pub default_page_size: usize,
    /// Largest page size a search request may ask for
    pub max_page_size: usize,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_path = env::var("BOARD_DB_PATH")
            .unwrap_or_else(|_| "./data/board.sqlite".to_string())
            .into();

        let bind_addr = env::var("BOARD_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()
            .expect("Invalid BOARD_BIND_ADDR format");

        let log_level = env::var("BOARD_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let search_timeout = Duration::from_millis(parse_or("BOARD_SEARCH_TIMEOUT_MS", 3000));

        let search_merge = parse_or("BOARD_SEARCH_MERGE", MergeMode::default());

        let default_page_size = parse_or("BOARD_DEFAULT_PAGE_SIZE", 10);
        let max_page_size = parse_or("BOARD_MAX_PAGE_SIZE", 100);

        Self {
            db_path,
            bind_addr,
            log_level,
            search_timeout,
            search_merge,
            default_page_size,
            max_page_size,
        }
    }
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(default)
}
