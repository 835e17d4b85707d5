// Configuration parsing from canopy.toml

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub routing: RoutingConfig,

    #[serde(default)]
    pub render: RenderConfig,

    #[serde(default)]
    pub dev: DevConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Directory served under `/static` (default: "static")
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

/// Routing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Directory containing convention files (default: "pages")
    #[serde(default = "default_pages_dir")]
    pub pages_dir: String,

    /// Whether static segments match case-insensitively (default: false)
    #[serde(default = "default_false")]
    pub case_insensitive: bool,
}

/// Rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Delay before a loading fallback is streamed
    #[serde(default = "default_loading_threshold_ms")]
    pub loading_threshold_ms: u64,

    /// Upper bound for a single component; 0 disables the limit
    #[serde(default = "default_handler_timeout_ms")]
    pub handler_timeout_ms: u64,

    /// Capacity of the frame channel used when streaming
    #[serde(default = "default_stream_buffer")]
    pub stream_buffer: usize,
}

/// Development configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevConfig {
    #[serde(default = "default_true")]
    pub hot_reload: bool,
}

// Default values
fn default_port() -> u16 {
    3000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_static_dir() -> String {
    "static".to_string()
}

fn default_pages_dir() -> String {
    "pages".to_string()
}

fn default_loading_threshold_ms() -> u64 {
    100
}

fn default_handler_timeout_ms() -> u64 {
    10_000
}

fn default_stream_buffer() -> usize {
    4
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            static_dir: default_static_dir(),
        }
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            pages_dir: default_pages_dir(),
            case_insensitive: false,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            loading_threshold_ms: default_loading_threshold_ms(),
            handler_timeout_ms: default_handler_timeout_ms(),
            stream_buffer: default_stream_buffer(),
        }
    }
}

impl Default for DevConfig {
    fn default() -> Self {
        Self { hot_reload: true }
    }
}

impl RenderConfig {
    pub fn loading_threshold(&self) -> Duration {
        Duration::from_millis(self.loading_threshold_ms)
    }

    /// `None` when timeouts are disabled
    pub fn handler_timeout(&self) -> Option<Duration> {
        (self.handler_timeout_ms > 0).then(|| Duration::from_millis(self.handler_timeout_ms))
    }
}

impl Config {
    /// Load configuration from a canopy.toml file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        // A missing or empty file means defaults
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        Ok(config)
    }

    /// Load configuration from the default path (./canopy.toml)
    pub fn load_default() -> Result<Self> {
        Self::load("canopy.toml")
    }

    /// `host:port` the server binds to
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.bind_addr(), "127.0.0.1:3000");
        assert_eq!(config.routing.pages_dir, "pages");
        assert!(!config.routing.case_insensitive);
        assert_eq!(config.render.loading_threshold(), Duration::from_millis(100));
        assert!(config.dev.hot_reload);
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let toml = r#"
            [routing]
            pages_dir = "app"

            [render]
            handler_timeout_ms = 0
        "#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.routing.pages_dir, "app");
        assert!(!config.routing.case_insensitive);
        assert_eq!(config.render.handler_timeout(), None);
        assert_eq!(config.render.stream_buffer, 4);
        assert_eq!(config.server.port, 3000);
    }

    #[test]
    fn test_load_missing_and_empty_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Config::load(dir.path().join("canopy.toml")).unwrap();
        assert_eq!(missing.server.port, 3000);

        let path = dir.path().join("empty.toml");
        std::fs::File::create(&path).unwrap().write_all(b"  \n").unwrap();
        assert_eq!(Config::load(&path).unwrap().routing.pages_dir, "pages");
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("canopy.toml");
        std::fs::write(&path, "[server]\nport = \"many\"").unwrap();
        let err = Config::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Failed to parse config file"));
    }
}
