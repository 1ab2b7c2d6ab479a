use crate::config::{CacheSettings, RateLimits};
use crate::core::cache::{CacheStats, QuoteCache};
use crate::core::rate_limit::RateLimiter;
use crate::domain::model::{HistoricalSeries, MarketMovers, SearchHit, StockQuote};
use crate::domain::ports::{MarketDataSource, StockApi};
use crate::utils::error::{Result, StockError};
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::sync::Arc;

pub const DEFAULT_PERIOD: &str = "1mo";
pub const MOVERS_LIMIT: usize = 5;
pub const SEARCH_LIMIT: usize = 10;

/// 期間對應的交易日筆數；無法辨識的期間回傳完整序列
pub fn period_limit(period: &str) -> Option<usize> {
    match period {
        "5d" => Some(5),
        "1mo" => Some(30),
        "3mo" => Some(90),
        "6mo" => Some(180),
        "1y" => Some(365),
        _ => None,
    }
}

/// 股票資料服務：在上游來源之外加上節流與報價快取
pub struct StockDataService {
    source: Arc<dyn MarketDataSource>,
    quote_limiter: RateLimiter,
    historical_limiter: RateLimiter,
    movers_limiter: RateLimiter,
    search_limiter: RateLimiter,
    cache: QuoteCache,
}

impl StockDataService {
    pub fn new(
        source: Arc<dyn MarketDataSource>,
        limits: &RateLimits,
        cache: &CacheSettings,
    ) -> Self {
        Self {
            source,
            quote_limiter: RateLimiter::new("get_stock_info", limits.quote),
            historical_limiter: RateLimiter::new("get_historical_data", limits.historical),
            movers_limiter: RateLimiter::new("get_top_gainers_losers", limits.movers),
            search_limiter: RateLimiter::new("search_stocks", limits.search),
            cache: QuoteCache::new(cache),
        }
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

fn normalize_symbol(symbol: &str) -> Result<String> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return Err(StockError::invalid_request("Symbol is required"));
    }
    Ok(symbol.to_uppercase())
}

#[async_trait]
impl StockApi for StockDataService {
    async fn get_stock_info(&self, symbol: &str) -> Result<StockQuote> {
        let symbol = normalize_symbol(symbol)?;

        if let Some(quote) = self.cache.get(&symbol) {
            tracing::debug!("Quote cache hit for {}", symbol);
            return Ok(quote);
        }

        let quote = self
            .quote_limiter
            .throttle(self.source.quote(&symbol))
            .await
            .inspect_err(|e| tracing::warn!("Failed to fetch data for {}: {}", symbol, e))?;

        self.cache.insert(&symbol, quote.clone());
        Ok(quote)
    }

    async fn get_historical_data(&self, symbol: &str, period: &str) -> Result<HistoricalSeries> {
        let symbol = normalize_symbol(symbol)?;
        let period = if period.trim().is_empty() {
            DEFAULT_PERIOD
        } else {
            period.trim()
        };

        let mut data = self
            .historical_limiter
            .throttle(self.source.daily_closes(&symbol))
            .await?;

        if let Some(limit) = period_limit(period) {
            data.truncate(limit);
        }

        tracing::debug!("Historical {} ({}): {} points", symbol, period, data.len());
        Ok(HistoricalSeries {
            symbol,
            period: period.to_string(),
            data,
        })
    }

    async fn get_market_movers(&self) -> Result<MarketMovers> {
        let (mut top_gainers, mut top_losers) = self
            .movers_limiter
            .throttle(async {
                let gainers = self.source.gainers().await?;
                let losers = self.source.losers().await?;
                Ok::<_, StockError>((gainers, losers))
            })
            .await?;

        top_gainers.truncate(MOVERS_LIMIT);
        top_losers.truncate(MOVERS_LIMIT);

        Ok(MarketMovers {
            top_gainers,
            top_losers,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        })
    }

    async fn search_stocks(&self, query: &str) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(StockError::invalid_request("Query is required"));
        }

        let mut hits = self
            .search_limiter
            .throttle(self.source.search(query, SEARCH_LIMIT))
            .await?;
        hits.truncate(SEARCH_LIMIT);
        Ok(hits)
    }
}
