use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use url::Url;

use crate::event::DEFAULT_EVENT_LOG_LEN;
use crate::model::window::DEFAULT_WINDOW_CAPACITY;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub deriv: DerivConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DerivConfig {
    pub ws_base_url: String,
    pub app_id: u32,
    pub symbol: String,
    #[serde(default)]
    pub symbols: Vec<String>,
    #[serde(skip)]
    pub api_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    #[serde(default = "default_resubscribe_delay_ms")]
    pub resubscribe_delay_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindowConfig {
    #[serde(default = "default_window_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_event_log_len")]
    pub event_log_len: usize,
}

fn default_reconnect_delay_ms() -> u64 {
    3_000
}

fn default_resubscribe_delay_ms() -> u64 {
    500
}

fn default_window_capacity() -> usize {
    DEFAULT_WINDOW_CAPACITY
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_event_log_len() -> usize {
    DEFAULT_EVENT_LOG_LEN
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            reconnect_delay_ms: default_reconnect_delay_ms(),
            resubscribe_delay_ms: default_resubscribe_delay_ms(),
        }
    }
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            capacity: default_window_capacity(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            event_log_len: default_event_log_len(),
        }
    }
}

impl SessionConfig {
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn resubscribe_delay(&self) -> Duration {
        Duration::from_millis(self.resubscribe_delay_ms)
    }
}

impl DerivConfig {
    /// Endpoint with the application id attached as a query parameter.
    pub fn ws_url(&self) -> Result<Url> {
        let mut url = Url::parse(&self.ws_base_url)
            .with_context(|| format!("invalid ws_base_url '{}'", self.ws_base_url))?;
        url.query_pairs_mut()
            .append_pair("app_id", &self.app_id.to_string());
        Ok(url)
    }

    pub fn tradable_symbols(&self) -> Vec<String> {
        let mut out = Vec::new();
        if !self.symbol.trim().is_empty() {
            out.push(self.symbol.trim().to_ascii_uppercase());
        }
        for sym in &self.symbols {
            let s = sym.trim().to_ascii_uppercase();
            if !s.is_empty() && !out.iter().any(|v| v == &s) {
                out.push(s);
            }
        }
        out
    }
}

fn config_path() -> PathBuf {
    std::env::var("TICK_PULSE_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config/default.toml"))
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();

        let path = config_path();
        let mut config = Self::load_from_path(&path)?;
        config.deriv.api_token = std::env::var("DERIV_API_TOKEN")
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&config_str)
            .with_context(|| format!("failed to parse {}", path.display()))
    }

    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Config = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.deriv.app_id == 0 {
            bail!("deriv.app_id must be > 0");
        }
        if self.deriv.symbol.trim().is_empty() {
            bail!("deriv.symbol must not be empty");
        }
        if self.window.capacity == 0 {
            bail!("window.capacity must be >= 1");
        }
        self.deriv
            .ws_url()
            .context("deriv.ws_base_url is invalid")?;
        Ok(())
    }
}
