use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// 股票報價，欄位名稱與 HTTP 回應一致
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockQuote {
    pub symbol: String,
    pub company_name: String,
    pub current_price: f64,
    pub previous_close: f64,
    pub change: f64,
    pub change_percent: f64,
    #[serde(with = "na", default)]
    pub volume: Option<u64>,
    #[serde(with = "na", default)]
    pub market_cap: Option<f64>,
    #[serde(with = "na", default)]
    pub pe_ratio: Option<f64>,
    #[serde(with = "na", default)]
    pub dividend_yield: Option<f64>,
    #[serde(rename = "52_week_high", with = "na", default)]
    pub week_52_high: Option<f64>,
    #[serde(rename = "52_week_low", with = "na", default)]
    pub week_52_low: Option<f64>,
    #[serde(with = "na", default)]
    pub sector: Option<String>,
    #[serde(with = "na", default)]
    pub industry: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: String,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalSeries {
    pub symbol: String,
    pub period: String,
    pub data: Vec<PricePoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMover {
    pub symbol: String,
    pub company_name: String,
    pub current_price: f64,
    pub change: f64,
    pub change_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketMovers {
    pub top_gainers: Vec<MarketMover>,
    pub top_losers: Vec<MarketMover>,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub symbol: String,
    pub company_name: String,
    #[serde(with = "na", default)]
    pub exchange: Option<String>,
    #[serde(with = "na", default)]
    pub currency: Option<String>,
}

/// MCP 請求：`{"method": "...", "params": {...}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpRequest {
    pub method: String,
    #[serde(default)]
    pub params: Map<String, Value>,
}

impl McpRequest {
    pub fn new(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            params: Map::new(),
        }
    }

    pub fn with_param(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.params.insert(key.to_string(), value.into());
        self
    }

    /// 取字串參數，空字串視為缺少
    pub fn str_param(&self, key: &str) -> Option<&str> {
        self.params
            .get(key)
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
    }
}

/// MCP 回應信封
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub method: String,
}

impl McpResponse {
    pub fn ok(method: impl Into<String>, data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            method: method.into(),
        }
    }

    pub fn failed(method: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            method: method.into(),
        }
    }
}

/// 缺值序列化成 `"N/A"`，反序列化時 `"N/A"` 與 `null` 都視為缺值
pub mod na {
    use crate::utils::format::NOT_AVAILABLE;
    use serde::de::{DeserializeOwned, Error as _};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(v) => v.serialize(serializer),
            None => serializer.serialize_str(NOT_AVAILABLE),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        match Value::deserialize(deserializer)? {
            Value::Null => Ok(None),
            Value::String(s) if s == NOT_AVAILABLE => Ok(None),
            other => serde_json::from_value(other).map(Some).map_err(D::Error::custom),
        }
    }
}
