#[cfg(feature = "cli")]
pub mod cli;
pub mod manifest;
pub mod toml_config;

use crate::domain::ports::ConfigProvider;
use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use std::time::Duration;
use toml_config::TomlConfig;

pub const DEFAULT_FMP_BASE_URL: &str = "https://financialmodelingprep.com/api/v3";
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8000";

/// 各上游方法的最小呼叫間隔
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimits {
    pub quote: Duration,
    pub historical: Duration,
    pub movers: Duration,
    pub search: Duration,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            quote: Duration::from_secs(1),
            historical: Duration::from_secs(1),
            movers: Duration::from_secs(2),
            search: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CacheSettings {
    pub capacity: usize,
    /// None 表示報價不過期，只靠容量淘汰
    pub ttl: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 100,
            ttl: Some(Duration::from_secs(60)),
        }
    }
}

/// 合併預設值、TOML 與命令列後的伺服器設定
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub base_url: String,
    pub api_key: Option<String>,
    pub request_timeout: Duration,
    pub rate_limits: RateLimits,
    pub cache: CacheSettings,
    pub json_logs: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            base_url: DEFAULT_FMP_BASE_URL.to_string(),
            api_key: None,
            request_timeout: Duration::from_secs(10),
            rate_limits: RateLimits::default(),
            cache: CacheSettings::default(),
            json_logs: false,
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// 套用 TOML 中有設定的欄位
    pub fn apply_toml(&mut self, toml: &TomlConfig) {
        if let Some(server) = &toml.server {
            if let Some(host) = &server.host {
                self.host = host.clone();
            }
            if let Some(port) = server.port {
                self.port = port;
            }
        }

        if let Some(upstream) = &toml.upstream {
            if let Some(base_url) = &upstream.base_url {
                self.base_url = base_url.clone();
            }
            if let Some(timeout) = upstream.timeout_seconds {
                self.request_timeout = Duration::from_secs(timeout);
            }
        }
        if let Some(key) = toml.api_key() {
            self.api_key = Some(key.to_string());
        }

        if let Some(limits) = &toml.rate_limit {
            let apply = |target: &mut Duration, ms: Option<u64>| {
                if let Some(ms) = ms {
                    *target = Duration::from_millis(ms);
                }
            };
            apply(&mut self.rate_limits.quote, limits.quote_interval_ms);
            apply(&mut self.rate_limits.historical, limits.historical_interval_ms);
            apply(&mut self.rate_limits.movers, limits.movers_interval_ms);
            apply(&mut self.rate_limits.search, limits.search_interval_ms);
        }

        if let Some(cache) = &toml.cache {
            if let Some(capacity) = cache.capacity {
                self.cache.capacity = capacity;
            }
            if let Some(ttl) = cache.ttl_seconds {
                self.cache.ttl = if ttl == 0 {
                    None
                } else {
                    Some(Duration::from_secs(ttl))
                };
            }
        }

        if let Some(json) = toml.logging.as_ref().and_then(|l| l.json) {
            self.json_logs = json;
        }
    }
}

impl ConfigProvider for ServerConfig {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("server.host", &self.host)?;
        validation::validate_range("server.port", self.port, 1, u16::MAX)?;
        validation::validate_url("upstream.base_url", &self.base_url)?;
        validation::validate_positive_number("cache.capacity", self.cache.capacity, 1)?;
        Ok(())
    }
}

/// 聊天客戶端設定
#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub server_url: String,
    pub request_timeout: Duration,
    pub max_messages: usize,
    pub welcome_message: String,
    pub popular_stocks: Vec<String>,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            max_messages: 50,
            welcome_message: "Hello! I'm your Indian Stock Market assistant. Ask me about stock prices, market trends, or any stock-related queries!".to_string(),
            popular_stocks: ["RELIANCE", "TCS", "INFY", "HDFCBANK", "ICICIBANK"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl Validate for ChatConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_url("server_url", &self.server_url)?;
        validation::validate_positive_number("max_messages", self.max_messages, 1)?;
        Ok(())
    }
}
