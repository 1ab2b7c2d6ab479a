pub mod adapters;
pub mod app;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

pub use adapters::{fmp::FmpClient, mcp_client::McpClient, storage::LocalStorage};
pub use config::{manifest::Manifest, ChatConfig, ServerConfig};
pub use core::stock_data::StockDataService;
pub use utils::error::{Result, StockError};
