use crate::config::toml_config::TomlConfig;
use crate::config::{ChatConfig, ServerConfig};
use crate::utils::error::Result;
use crate::utils::validation::Validate;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Parser)]
#[command(name = "stock-mcp")]
#[command(about = "Indian stock market MCP server")]
pub struct ServerArgs {
    /// Path to an optional TOML configuration file
    #[arg(short, long, env = "STOCK_MCP_CONFIG")]
    pub config: Option<PathBuf>,

    #[arg(long, env = "MCP_HOST")]
    pub host: Option<String>,

    #[arg(long, env = "PORT")]
    pub port: Option<u16>,

    /// Financial Modeling Prep API key
    #[arg(long, env = "FMP_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    #[arg(long, env = "FMP_BASE_URL")]
    pub base_url: Option<String>,

    /// Emit JSON logs (container friendly)
    #[arg(long)]
    pub json_logs: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ServerArgs {
    /// 預設值 < TOML < 命令列/環境變數
    pub fn load_config(&self) -> Result<ServerConfig> {
        let mut config = ServerConfig::default();

        if let Some(path) = &self.config {
            let toml = TomlConfig::from_file(path)?;
            toml.validate()?;
            config.apply_toml(&toml);
        }

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(key) = self.api_key.as_ref().filter(|k| !k.is_empty()) {
            config.api_key = Some(key.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if self.json_logs {
            config.json_logs = true;
        }

        config.validate()?;
        Ok(config)
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "stock-chat")]
#[command(about = "Terminal chatbot for the Indian stock market MCP server")]
pub struct ChatArgs {
    #[arg(long, env = "MCP_SERVER_URL", default_value = crate::config::DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Answer a single question and exit
    #[arg(short, long)]
    pub query: Option<String>,

    #[arg(long, default_value = "10")]
    pub timeout_seconds: u64,

    #[arg(long, default_value = "50")]
    pub max_messages: usize,

    /// Directory where chart data is saved as CSV
    #[arg(long)]
    pub export_dir: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl ChatArgs {
    pub fn to_config(&self) -> ChatConfig {
        ChatConfig {
            server_url: self.server_url.trim_end_matches('/').to_string(),
            request_timeout: Duration::from_secs(self.timeout_seconds),
            max_messages: self.max_messages,
            ..ChatConfig::default()
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "manifest-check")]
#[command(about = "Validate a compose manifest and print the service start order")]
pub struct ManifestArgs {
    #[arg(default_value = "docker-compose.yml")]
    pub path: PathBuf,

    /// Also require every env_file to exist next to the manifest
    #[arg(long)]
    pub check_env_files: bool,

    /// Print the parsed manifest as JSON
    #[arg(long)]
    pub json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}
