pub mod cache;
pub mod mcp;
pub mod rate_limit;
pub mod stock_data;

pub use crate::domain::model::{
    HistoricalSeries, McpRequest, McpResponse, MarketMover, MarketMovers, PricePoint, SearchHit,
    StockQuote,
};
pub use crate::domain::ports::{ConfigProvider, MarketDataSource, StockApi, Storage};
pub use crate::utils::error::Result;
