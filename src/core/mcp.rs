//! MCP 方法分派：把 `{method, params}` 轉成對 [`StockApi`] 的呼叫，
//! 結果一律包成 `{success, data | error, method}`。

use crate::core::stock_data::DEFAULT_PERIOD;
use crate::domain::model::{McpRequest, McpResponse};
use crate::domain::ports::StockApi;
use crate::utils::error::{Result, StockError};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum McpMethod {
    GetStockInfo,
    GetHistoricalData,
    GetTopGainersLosers,
    SearchStocks,
}

impl McpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            McpMethod::GetStockInfo => "get_stock_info",
            McpMethod::GetHistoricalData => "get_historical_data",
            McpMethod::GetTopGainersLosers => "get_top_gainers_losers",
            McpMethod::SearchStocks => "search_stocks",
        }
    }
}

impl fmt::Display for McpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for McpMethod {
    type Err = StockError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "get_stock_info" => Ok(McpMethod::GetStockInfo),
            "get_historical_data" => Ok(McpMethod::GetHistoricalData),
            "get_top_gainers_losers" => Ok(McpMethod::GetTopGainersLosers),
            "search_stocks" => Ok(McpMethod::SearchStocks),
            other => Err(StockError::invalid_request(format!(
                "Unknown method: {}",
                other
            ))),
        }
    }
}

pub async fn dispatch(api: &dyn StockApi, request: &McpRequest) -> McpResponse {
    match handle(api, request).await {
        Ok(data) => McpResponse::ok(&request.method, data),
        Err(e) => {
            tracing::warn!("MCP {} failed: {}", request.method, e);
            McpResponse::failed(&request.method, e.to_string())
        }
    }
}

async fn handle(api: &dyn StockApi, request: &McpRequest) -> Result<Value> {
    let method: McpMethod = request.method.parse()?;
    tracing::debug!("MCP {} params={:?}", method, request.params);

    let data = match method {
        McpMethod::GetStockInfo => {
            let symbol = required(request, "symbol", "Symbol is required")?;
            serde_json::to_value(api.get_stock_info(symbol).await?)?
        }
        McpMethod::GetHistoricalData => {
            let symbol = required(request, "symbol", "Symbol is required")?;
            let period = request.str_param("period").unwrap_or(DEFAULT_PERIOD);
            serde_json::to_value(api.get_historical_data(symbol, period).await?)?
        }
        McpMethod::GetTopGainersLosers => serde_json::to_value(api.get_market_movers().await?)?,
        McpMethod::SearchStocks => {
            let query = required(request, "query", "Query is required")?;
            serde_json::to_value(api.search_stocks(query).await?)?
        }
    };

    Ok(data)
}

fn required<'a>(request: &'a McpRequest, key: &str, message: &str) -> Result<&'a str> {
    request
        .str_param(key)
        .ok_or_else(|| StockError::invalid_request(message))
}
