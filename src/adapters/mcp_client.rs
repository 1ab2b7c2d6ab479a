use crate::config::ChatConfig;
use crate::core::mcp::McpMethod;
use crate::domain::model::{
    HistoricalSeries, McpRequest, McpResponse, MarketMovers, SearchHit, StockQuote,
};
use crate::domain::ports::StockApi;
use crate::utils::error::{Result, StockError};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;

/// 透過 `POST /mcp` 呼叫股票服務的 HTTP 客戶端
pub struct McpClient {
    client: Client,
    endpoint: String,
}

impl McpClient {
    pub fn new(config: &ChatConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/mcp", config.server_url.trim_end_matches('/')),
        })
    }

    /// 逾時或連線失敗時重試一次
    pub async fn call(&self, request: &McpRequest) -> Result<McpResponse> {
        match self.send(request).await {
            Err(e) if e.is_retryable() => {
                tracing::warn!("⚠️ {} failed ({}), retrying once", request.method, e);
                self.send(request).await
            }
            result => result,
        }
    }

    async fn send(&self, request: &McpRequest) -> Result<McpResponse> {
        tracing::debug!("POST {} method={}", self.endpoint, request.method);
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json::<McpResponse>().await?)
    }

    async fn call_data<T: DeserializeOwned>(&self, request: McpRequest) -> Result<T> {
        let response = self.call(&request).await?;

        if !response.success {
            return Err(StockError::upstream(
                response
                    .error
                    .unwrap_or_else(|| format!("{} failed", response.method)),
            ));
        }

        let data = response.data.ok_or_else(|| {
            StockError::upstream(format!("{} returned no data", response.method))
        })?;
        Ok(serde_json::from_value(data)?)
    }
}

#[async_trait]
impl StockApi for McpClient {
    async fn get_stock_info(&self, symbol: &str) -> Result<StockQuote> {
        self.call_data(McpRequest::new(McpMethod::GetStockInfo.as_str()).with_param("symbol", symbol))
            .await
    }

    async fn get_historical_data(&self, symbol: &str, period: &str) -> Result<HistoricalSeries> {
        self.call_data(
            McpRequest::new(McpMethod::GetHistoricalData.as_str())
                .with_param("symbol", symbol)
                .with_param("period", period),
        )
        .await
    }

    async fn get_market_movers(&self) -> Result<MarketMovers> {
        self.call_data(McpRequest::new(McpMethod::GetTopGainersLosers.as_str()))
            .await
    }

    async fn search_stocks(&self, query: &str) -> Result<Vec<SearchHit>> {
        self.call_data(McpRequest::new(McpMethod::SearchStocks.as_str()).with_param("query", query))
            .await
    }
}
