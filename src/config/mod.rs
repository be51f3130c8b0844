//! Configuration module for the chat widget backend.
//!
//! All configuration is loaded from environment variables with sensible defaults.

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

use crate::errors::AppError;

/// URL path the widget assets are mounted under.
pub const ASSET_MOUNT: &str = "/assets/chat-widget";

/// File name of the external widget script inside the asset directory.
pub const WIDGET_SCRIPT: &str = "chatbot.js";

/// Which persistence backend holds the settings record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Sqlite,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(StoreBackend::Sqlite),
            "memory" => Ok(StoreBackend::Memory),
            other => Err(AppError::Config(format!(
                "Unknown CHAT_WIDGET_STORE value: {}",
                other
            ))),
        }
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Pre-shared key granting edit rights on the settings (open when unset)
    pub admin_key: Option<String>,
    /// Path to SQLite database file
    pub db_path: PathBuf,
    /// Address to bind the server to
    pub bind_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// Directory of public pages that receive the widget
    pub public_dir: PathBuf,
    /// Directory holding chatbot.js
    pub asset_dir: PathBuf,
    /// Version appended to the widget script URL
    pub script_version: String,
    /// Option name the settings record is stored under
    pub option_name: String,
    /// Path prefix of the administrative area
    pub admin_prefix: String,
    pub store: StoreBackend,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, AppError> {
        dotenvy::dotenv().ok();

        let admin_key = env::var("CHAT_WIDGET_ADMIN_KEY")
            .ok()
            .filter(|key| !key.is_empty());

        let db_path = env::var("CHAT_WIDGET_DB_PATH")
            .unwrap_or_else(|_| "./data/chat-widget.sqlite".to_string())
            .into();

        let bind_addr = env::var("CHAT_WIDGET_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string());
        let bind_addr = bind_addr.parse::<SocketAddr>().map_err(|e| {
            AppError::Config(format!("Invalid CHAT_WIDGET_BIND_ADDR {}: {}", bind_addr, e))
        })?;

        let log_level = env::var("CHAT_WIDGET_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let public_dir = env::var("CHAT_WIDGET_PUBLIC_DIR")
            .unwrap_or_else(|_| "./public".to_string())
            .into();

        let asset_dir = env::var("CHAT_WIDGET_ASSET_DIR")
            .unwrap_or_else(|_| "./assets".to_string())
            .into();

        let script_version =
            env::var("CHAT_WIDGET_SCRIPT_VERSION").unwrap_or_else(|_| "1.0".to_string());

        let option_name =
            env::var("CHAT_WIDGET_OPTION_NAME").unwrap_or_else(|_| "chat_widget".to_string());

        let admin_prefix = env::var("CHAT_WIDGET_ADMIN_PREFIX")
            .map(|prefix| prefix.trim_end_matches('/').to_string())
            .unwrap_or_else(|_| "/admin".to_string());
        if !admin_prefix.starts_with('/') {
            return Err(AppError::Config(format!(
                "CHAT_WIDGET_ADMIN_PREFIX must be a non-root path starting with '/': {:?}",
                admin_prefix
            )));
        }

        let store = match env::var("CHAT_WIDGET_STORE") {
            Ok(value) => value.parse::<StoreBackend>()?,
            Err(_) => StoreBackend::Sqlite,
        };

        Ok(Self {
            admin_key,
            db_path,
            bind_addr,
            log_level,
            public_dir,
            asset_dir,
            script_version,
            option_name,
            admin_prefix,
            store,
        })
    }

    /// Whether a request path belongs to the administrative area.
    pub fn is_admin_path(&self, path: &str) -> bool {
        match path.strip_prefix(self.admin_prefix.as_str()) {
            Some(rest) => rest.is_empty() || rest.starts_with('/'),
            None => false,
        }
    }

    /// Versioned URL of the external widget script.
    pub fn script_url(&self) -> String {
        format!(
            "{}/{}?ver={}",
            ASSET_MOUNT, WIDGET_SCRIPT, self.script_version
        )
    }
}

#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        admin_key: None,
        db_path: "./data/test.sqlite".into(),
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        public_dir: "./public".into(),
        asset_dir: "./assets".into(),
        script_version: "1.0".to_string(),
        option_name: "chat_widget".to_string(),
        admin_prefix: "/admin".to_string(),
        store: StoreBackend::Memory,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        // Clear any existing env vars
        for var in [
            "CHAT_WIDGET_ADMIN_KEY",
            "CHAT_WIDGET_DB_PATH",
            "CHAT_WIDGET_BIND_ADDR",
            "CHAT_WIDGET_LOG_LEVEL",
            "CHAT_WIDGET_PUBLIC_DIR",
            "CHAT_WIDGET_ASSET_DIR",
            "CHAT_WIDGET_SCRIPT_VERSION",
            "CHAT_WIDGET_OPTION_NAME",
            "CHAT_WIDGET_ADMIN_PREFIX",
            "CHAT_WIDGET_STORE",
        ] {
            env::remove_var(var);
        }

        let config = Config::from_env().unwrap();

        assert!(config.admin_key.is_none());
        assert_eq!(config.db_path, PathBuf::from("./data/chat-widget.sqlite"));
        assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8080");
        assert_eq!(config.log_level, "info");
        assert_eq!(config.script_version, "1.0");
        assert_eq!(config.option_name, "chat_widget");
        assert_eq!(config.admin_prefix, "/admin");
        assert_eq!(config.store, StoreBackend::Sqlite);
    }

    #[test]
    fn test_admin_path_predicate() {
        let config = test_config();

        assert!(config.is_admin_path("/admin"));
        assert!(config.is_admin_path("/admin/settings"));
        assert!(!config.is_admin_path("/administrator"));
        assert!(!config.is_admin_path("/"));
        assert!(!config.is_admin_path("/blog/admin"));
    }

    #[test]
    fn test_script_url_is_versioned() {
        let mut config = test_config();
        config.script_version = "2.3".to_string();

        assert_eq!(config.script_url(), "/assets/chat-widget/chatbot.js?ver=2.3");
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("sqlite".parse::<StoreBackend>().unwrap(), StoreBackend::Sqlite);
        assert_eq!(" Memory ".parse::<StoreBackend>().unwrap(), StoreBackend::Memory);
        assert!("redis".parse::<StoreBackend>().is_err());
    }
}
