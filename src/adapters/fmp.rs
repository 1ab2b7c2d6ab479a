//! Financial Modeling Prep (FMP) REST 來源

use crate::domain::model::{MarketMover, PricePoint, SearchHit, StockQuote};
use crate::domain::ports::{ConfigProvider, MarketDataSource};
use crate::utils::error::{Result, StockError};
use crate::utils::format::round2;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpQuote {
    symbol: Option<String>,
    name: Option<String>,
    price: Option<f64>,
    previous_close: Option<f64>,
    change: Option<f64>,
    changes_percentage: Option<f64>,
    volume: Option<f64>,
    market_cap: Option<f64>,
    pe: Option<f64>,
    last_div: Option<f64>,
    year_high: Option<f64>,
    year_low: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct FmpHistoricalEntry {
    date: String,
    close: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpMover {
    symbol: Option<String>,
    name: Option<String>,
    price: Option<f64>,
    change: Option<f64>,
    changes_percentage: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpSearchHit {
    symbol: Option<String>,
    name: Option<String>,
    currency: Option<String>,
    stock_exchange: Option<String>,
    exchange_short_name: Option<String>,
}

pub struct FmpClient {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl FmpClient {
    pub fn new<C: ConfigProvider>(config: &C) -> Result<Self> {
        let base_url = Url::parse(config.base_url()).map_err(|e| {
            StockError::InvalidConfigValueError {
                field: "upstream.base_url".to_string(),
                value: config.base_url().to_string(),
                reason: e.to_string(),
            }
        })?;

        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key().map(str::to_string),
        })
    }

    fn endpoint(&self, segments: &[&str], query: &[(&str, &str)]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| StockError::ConfigError {
                message: format!("base url cannot have a path: {}", self.base_url),
            })?
            .pop_if_empty()
            .extend(segments);

        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in query {
                pairs.append_pair(key, value);
            }
            if let Some(key) = &self.api_key {
                pairs.append_pair("apikey", key);
            }
        }

        Ok(url)
    }

    async fn get_json(&self, url: Url) -> Result<Value> {
        // URL 內含 apikey，只記錄路徑
        tracing::debug!("Making API request to: {}", url.path());
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();
        tracing::debug!("API response status: {}", status);

        let body: Value = response.json().await.unwrap_or(Value::Null);

        if let Some(message) = body.get("Error Message").and_then(Value::as_str) {
            return Err(StockError::upstream(message));
        }
        if !status.is_success() {
            return Err(StockError::upstream(format!(
                "Upstream returned HTTP {} for {}",
                status.as_u16(),
                url.path()
            )));
        }

        Ok(body)
    }

    async fn get_list<T: DeserializeOwned>(&self, url: Url) -> Result<Vec<T>> {
        match self.get_json(url).await? {
            Value::Array(items) => Ok(items
                .into_iter()
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect()),
            _ => Err(StockError::upstream("Invalid response from API")),
        }
    }

    async fn movers(&self, list: &str) -> Result<Vec<MarketMover>> {
        let url = self.endpoint(&["stock_market", list], &[])?;
        let movers: Vec<FmpMover> = self.get_list(url).await.map_err(|e| {
            StockError::upstream(format!("Failed to fetch gainers/losers: {}", e))
        })?;

        Ok(movers
            .into_iter()
            .filter_map(|m| {
                let symbol = m.symbol?;
                Some(MarketMover {
                    company_name: m.name.unwrap_or_else(|| symbol.clone()),
                    symbol,
                    current_price: round2(m.price.unwrap_or(0.0)),
                    change: round2(m.change.unwrap_or(0.0)),
                    change_percent: round2(m.changes_percentage.unwrap_or(0.0)),
                })
            })
            .collect())
    }
}

#[async_trait]
impl MarketDataSource for FmpClient {
    async fn quote(&self, symbol: &str) -> Result<StockQuote> {
        let url = self.endpoint(&["quote", symbol], &[])?;
        let quotes: Vec<FmpQuote> = self.get_list(url).await?;
        let stock = quotes
            .into_iter()
            .next()
            .ok_or_else(|| StockError::upstream("Invalid response from API"))?;

        Ok(StockQuote {
            symbol: stock.symbol.unwrap_or_else(|| symbol.to_string()),
            company_name: stock.name.unwrap_or_else(|| "N/A".to_string()),
            current_price: round2(stock.price.unwrap_or(0.0)),
            previous_close: round2(stock.previous_close.unwrap_or(0.0)),
            change: round2(stock.change.unwrap_or(0.0)),
            change_percent: round2(stock.changes_percentage.unwrap_or(0.0)),
            volume: stock.volume.map(|v| v.max(0.0) as u64),
            market_cap: stock.market_cap,
            pe_ratio: stock.pe,
            dividend_yield: stock.last_div,
            week_52_high: stock.year_high,
            week_52_low: stock.year_low,
            // quote 端點沒有產業資訊
            sector: None,
            industry: None,
        })
    }

    async fn daily_closes(&self, symbol: &str) -> Result<Vec<PricePoint>> {
        let url = self.endpoint(
            &["historical-price-full", symbol],
            &[("serietype", "line")],
        )?;
        let body = self.get_json(url).await?;

        let entries = body
            .get("historical")
            .and_then(Value::as_array)
            .ok_or_else(|| StockError::not_found("Historical data not available."))?;

        Ok(entries
            .iter()
            .filter_map(|entry| serde_json::from_value::<FmpHistoricalEntry>(entry.clone()).ok())
            .filter_map(|entry| {
                entry.close.map(|close| PricePoint {
                    date: entry.date,
                    close: round2(close),
                })
            })
            .collect())
    }

    async fn gainers(&self) -> Result<Vec<MarketMover>> {
        self.movers("gainers").await
    }

    async fn losers(&self) -> Result<Vec<MarketMover>> {
        self.movers("losers").await
    }

    async fn search(&self, query: &str, limit: usize) -> Result<Vec<SearchHit>> {
        let limit = limit.to_string();
        let url = self.endpoint(
            &["search"],
            &[("query", query), ("limit", &limit), ("exchange", "NASDAQ")],
        )?;
        let hits: Vec<FmpSearchHit> = self
            .get_list(url)
            .await
            .map_err(|e| StockError::upstream(format!("Search failed: {}", e)))?;

        Ok(hits
            .into_iter()
            .filter_map(|hit| {
                let symbol = hit.symbol?;
                Some(SearchHit {
                    company_name: hit.name.unwrap_or_else(|| "N/A".to_string()),
                    symbol,
                    exchange: hit.exchange_short_name.or(hit.stock_exchange),
                    currency: hit.currency,
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client(server: &MockServer) -> FmpClient {
        let config = ServerConfig {
            base_url: server.url("/api/v3"),
            api_key: Some("test-key".to_string()),
            ..ServerConfig::default()
        };
        FmpClient::new(&config).unwrap()
    }

    #[test]
    fn test_endpoint_building() {
        let config = ServerConfig {
            base_url: "https://financialmodelingprep.com/api/v3/".to_string(),
            api_key: Some("k".to_string()),
            ..ServerConfig::default()
        };
        let fmp = FmpClient::new(&config).unwrap();
        let url = fmp
            .endpoint(&["search"], &[("query", "tata motors"), ("limit", "10")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://financialmodelingprep.com/api/v3/search?query=tata+motors&limit=10&apikey=k"
        );
    }

    #[tokio::test]
    async fn test_quote_maps_fields() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/quote/TCS")
                .query_param("apikey", "test-key");
            then.status(200).json_body(json!([{
                "symbol": "TCS",
                "name": "Tata Consultancy Services",
                "price": 3890.456,
                "previousClose": 3850.0,
                "change": 40.456,
                "changesPercentage": 1.0508,
                "volume": 1234567,
                "marketCap": 14100000000000.0,
                "pe": 29.4,
                "yearHigh": 4254.75,
                "yearLow": 3311.0
            }]));
        });

        let quote = client(&server).quote("TCS").await.unwrap();
        mock.assert();

        assert_eq!(quote.company_name, "Tata Consultancy Services");
        assert_eq!(quote.current_price, 3890.46);
        assert_eq!(quote.change_percent, 1.05);
        assert_eq!(quote.volume, Some(1_234_567));
        assert_eq!(quote.dividend_yield, None);
        assert_eq!(quote.week_52_low, Some(3311.0));
        assert_eq!(quote.sector, None);
    }

    #[tokio::test]
    async fn test_quote_empty_list_is_invalid() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/quote/NOPE");
            then.status(200).json_body(json!([]));
        });

        let err = client(&server).quote("NOPE").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid response from API");
    }

    #[tokio::test]
    async fn test_upstream_error_message_is_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/quote/TCS");
            then.status(401)
                .json_body(json!({"Error Message": "Invalid API KEY."}));
        });

        let err = client(&server).quote("TCS").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid API KEY.");
    }

    #[tokio::test]
    async fn test_daily_closes() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/historical-price-full/INFY")
                .query_param("serietype", "line");
            then.status(200).json_body(json!({
                "symbol": "INFY",
                "historical": [
                    {"date": "2024-03-05", "close": 1620.456},
                    {"date": "2024-03-04", "close": 1610.0},
                    {"date": "2024-03-01"}
                ]
            }));
        });

        let points = client(&server).daily_closes("INFY").await.unwrap();
        mock.assert();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].close, 1620.46);
        assert_eq!(points[1].date, "2024-03-04");
    }

    #[tokio::test]
    async fn test_daily_closes_missing_history() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/historical-price-full/XYZ");
            then.status(200).json_body(json!({}));
        });

        let err = client(&server).daily_closes("XYZ").await.unwrap_err();
        assert_eq!(err.to_string(), "Historical data not available.");
    }

    #[tokio::test]
    async fn test_movers_are_normalized() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v3/stock_market/gainers");
            then.status(200).json_body(json!([
                {"symbol": "ABC", "name": "Abc Corp", "price": 10.123, "change": 2.0, "changesPercentage": 24.999},
                {"name": "no symbol"}
            ]));
        });

        let gainers = client(&server).gainers().await.unwrap();
        assert_eq!(gainers.len(), 1);
        assert_eq!(gainers[0].current_price, 10.12);
        assert_eq!(gainers[0].change_percent, 25.0);
    }

    #[tokio::test]
    async fn test_search_query_parameters() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v3/search")
                .query_param("query", "bank")
                .query_param("limit", "10")
                .query_param("exchange", "NASDAQ")
                .query_param("apikey", "test-key");
            then.status(200).json_body(json!([
                {"symbol": "HDB", "name": "HDFC Bank Limited", "currency": "USD",
                 "stockExchange": "NASDAQ Global Select", "exchangeShortName": "NASDAQ"}
            ]));
        });

        let hits = client(&server).search("bank", 10).await.unwrap();
        mock.assert();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].company_name, "HDFC Bank Limited");
        assert_eq!(hits[0].exchange.as_deref(), Some("NASDAQ"));
    }
}
