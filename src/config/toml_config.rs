use crate::utils::env::substitute_env_vars;
use crate::utils::error::{Result, StockError};
use crate::utils::validation::Validate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 伺服器的 TOML 設定檔，所有區段都可省略
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    pub server: Option<ServerSection>,
    pub upstream: Option<UpstreamSection>,
    pub rate_limit: Option<RateLimitSection>,
    pub cache: Option<CacheSection>,
    pub logging: Option<LoggingSection>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServerSection {
    pub host: Option<String>,
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpstreamSection {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RateLimitSection {
    pub quote_interval_ms: Option<u64>,
    pub historical_interval_ms: Option<u64>,
    pub movers_interval_ms: Option<u64>,
    pub search_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CacheSection {
    pub capacity: Option<usize>,
    pub ttl_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingSection {
    pub json: Option<bool>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(StockError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| StockError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        if let Some(base_url) = self.upstream.as_ref().and_then(|u| u.base_url.as_deref()) {
            crate::utils::validation::validate_url("upstream.base_url", base_url)?;
        }

        if let Some(port) = self.server.as_ref().and_then(|s| s.port) {
            crate::utils::validation::validate_range("server.port", port, 1, u16::MAX)?;
        }

        if let Some(capacity) = self.cache.as_ref().and_then(|c| c.capacity) {
            crate::utils::validation::validate_positive_number("cache.capacity", capacity, 1)?;
        }

        if let Some(timeout) = self.upstream.as_ref().and_then(|u| u.timeout_seconds) {
            crate::utils::validation::validate_range("upstream.timeout_seconds", timeout, 1, 300)?;
        }

        Ok(())
    }

    /// 取得 API key；未替換的 `${VAR}` 視為未設定
    pub fn api_key(&self) -> Option<&str> {
        self.upstream
            .as_ref()
            .and_then(|u| u.api_key.as_deref())
            .filter(|key| !key.is_empty() && !key.starts_with("${"))
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
