//! Application configuration management.

use std::path::{Path, PathBuf};
use std::time::Duration;

use color_eyre::Result;
use serde::{Deserialize, Serialize};

use crate::ui::components::volume::DEFAULT_VOLUME;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the TUI sends catalog lookups
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Gateway service settings (`serve` and the embedded gateway)
    #[serde(default)]
    pub server: ServerConfig,

    /// Player configuration
    #[serde(default)]
    pub player: PlayerConfig,

    /// Search configuration
    #[serde(default)]
    pub search: SearchConfig,

    /// UI configuration
    #[serde(default)]
    pub ui: UiConfig,
}

/// Catalog gateway client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Gateway base URL (e.g., "http://127.0.0.1:3000").
    /// When unset, a gateway is started inside the TUI process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Seconds to wait for a lookup before treating it as failed
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

/// Gateway service configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen address for `serve`
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Upstream catalog API base URL
    #[serde(default = "default_upstream")]
    pub upstream: String,
}

/// Player configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Initial volume (0.0-1.0)
    #[serde(default = "default_volume")]
    pub volume: f32,
}

/// Search configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Quiet period before a lookup is issued
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

/// UI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Show cover art (requires sixel/kitty support)
    #[serde(default = "default_true")]
    pub show_cover: bool,

    /// Draw the volume bar as a vertical column beside the results
    #[serde(default)]
    pub vertical_volume: bool,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_bind() -> String {
    String::from("127.0.0.1:3000")
}

fn default_upstream() -> String {
    String::from("https://api.deezer.com")
}

fn default_volume() -> f32 {
    DEFAULT_VOLUME
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_true() -> bool {
    true
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            upstream: default_upstream(),
        }
    }
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            volume: default_volume(),
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            show_cover: true,
            vertical_volume: false,
        }
    }
}

impl Config {
    /// Get the default configuration file path.
    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine config directory"))?;

        Ok(config_dir.join("preview-tui").join("config.toml"))
    }

    /// Load configuration from `path`, or from the default location.
    /// A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::config_path()?,
        };

        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        Self::parse(&contents)
    }

    /// Parse TOML and clamp values to their valid ranges.
    pub fn parse(contents: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(contents)?;

        config.player.volume = if config.player.volume.is_nan() {
            DEFAULT_VOLUME
        } else {
            config.player.volume.clamp(0.0, 1.0)
        };
        config.gateway.timeout_secs = config.gateway.timeout_secs.max(1);
        if let Some(url) = &config.gateway.url {
            if url.trim().is_empty() {
                config.gateway.url = None;
            }
        }

        Ok(config)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.gateway.timeout_secs)
    }

    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.search.debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = Config::parse("").unwrap();
        assert_eq!(config.gateway.url, None);
        assert_eq!(config.timeout(), Duration::from_secs(10));
        assert_eq!(config.debounce(), Duration::from_millis(300));
        assert_eq!(config.player.volume, 0.7);
        assert_eq!(config.server.upstream, "https://api.deezer.com");
        assert!(config.ui.show_cover);
        assert!(!config.ui.vertical_volume);
    }

    #[test]
    fn test_partial_sections() {
        let config = Config::parse(
            r#"
            [gateway]
            url = "http://music.local:8080"

            [ui]
            vertical_volume = true
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.url.as_deref(), Some("http://music.local:8080"));
        assert_eq!(config.gateway.timeout_secs, 10);
        assert!(config.ui.vertical_volume);
        assert!(config.ui.show_cover);
    }

    #[test]
    fn test_values_are_clamped() {
        let config = Config::parse(
            r#"
            [gateway]
            url = "  "
            timeout_secs = 0

            [player]
            volume = 3.5
            "#,
        )
        .unwrap();

        assert_eq!(config.gateway.url, None);
        assert_eq!(config.gateway.timeout_secs, 1);
        assert_eq!(config.player.volume, 1.0);
    }

    #[test]
    fn test_missing_file_is_default() {
        let config = Config::load(Some(Path::new("/nonexistent/preview-tui.toml"))).unwrap();
        assert_eq!(config.player.volume, 0.7);
    }
}
