use crate::domain::model::{
    HistoricalSeries, MarketMover, MarketMovers, PricePoint, SearchHit, StockQuote,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// 上游行情來源的連線設定
pub trait ConfigProvider: Send + Sync {
    fn base_url(&self) -> &str;
    fn api_key(&self) -> Option<&str>;
    fn request_timeout(&self) -> Duration;
}

/// 上游行情來源（FMP 或測試替身）
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    async fn quote(&self, symbol: &str) -> Result<StockQuote>;
    /// 日收盤價，最新的在前
    async fn daily_closes(&self, symbol: &str) -> Result<Vec<PricePoint>>;
    async fn gainers(&self) -> Result<Vec<MarketMover>>;
    async fn losers(&self) -> Result<Vec<MarketMover>>;
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>>;
}

/// 對外提供的四個股票查詢方法
#[async_trait]
pub trait StockApi: Send + Sync {
    async fn get_stock_info(&self, symbol: &str) -> Result<StockQuote>;
    async fn get_historical_data(&self, symbol: &str, period: &str) -> Result<HistoricalSeries>;
    async fn get_market_movers(&self) -> Result<MarketMovers>;
    async fn search_stocks(&self, query: &str) -> Result<Vec<SearchHit>>;
}
