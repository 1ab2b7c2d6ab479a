use anyhow::Result;
use httpmock::prelude::*;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use stock_mcp::app::chat::{ChatBot, ChatSession, Reply};
use stock_mcp::app::server::{create_app, AppState};
use stock_mcp::config::{ChatConfig, RateLimits, ServerConfig};
use stock_mcp::{FmpClient, McpClient, StockDataService};
use tokio::net::TcpListener;

fn no_limits() -> RateLimits {
    RateLimits {
        quote: Duration::ZERO,
        historical: Duration::ZERO,
        movers: Duration::ZERO,
        search: Duration::ZERO,
    }
}

/// 以 httpmock 扮演 FMP，啟動真正的 HTTP 伺服器，回傳 base url
async fn spawn_server(fmp: &MockServer) -> Result<String> {
    let config = ServerConfig {
        base_url: fmp.url("/api/v3"),
        api_key: Some("demo".to_string()),
        rate_limits: no_limits(),
        ..ServerConfig::default()
    };

    let source = FmpClient::new(&config)?;
    let service = StockDataService::new(Arc::new(source), &config.rate_limits, &config.cache);
    let app = create_app(AppState::new(Arc::new(service)));

    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok(format!("http://{}", addr))
}

fn mock_quote<'a>(fmp: &'a MockServer, symbol: &str) -> httpmock::Mock<'a> {
    let symbol = symbol.to_string();
    fmp.mock(move |when, then| {
        when.method(GET)
            .path(format!("/api/v3/quote/{}", symbol))
            .query_param("apikey", "demo");
        then.status(200).json_body(json!([{
            "symbol": symbol,
            "name": "Tata Consultancy Services",
            "price": 3890.456,
            "previousClose": 3850.0,
            "change": 40.456,
            "changesPercentage": 1.0508,
            "volume": 1234567,
            "marketCap": 14100000000000.0,
            "yearHigh": 4254.75,
            "yearLow": 3311.0
        }]));
    })
}

fn mock_movers(fmp: &MockServer) {
    let movers = |prefix: &str, count: usize, pct: f64| -> Value {
        (0..count)
            .map(|i| {
                json!({
                    "symbol": format!("{}{}", prefix, i),
                    "name": format!("{} Corp {}", prefix, i),
                    "price": 10.0 + i as f64,
                    "change": pct / 10.0,
                    "changesPercentage": pct
                })
            })
            .collect()
    };
    let gainers = movers("UP", 7, 12.5);
    let losers = movers("DN", 6, -8.25);

    fmp.mock(|when, then| {
        when.method(GET).path("/api/v3/stock_market/gainers");
        then.status(200).json_body(gainers);
    });
    fmp.mock(|when, then| {
        when.method(GET).path("/api/v3/stock_market/losers");
        then.status(200).json_body(losers);
    });
}

#[tokio::test]
async fn test_rest_quote_is_cached() -> Result<()> {
    let fmp = MockServer::start();
    let quote_mock = mock_quote(&fmp, "TCS");
    let base = spawn_server(&fmp).await?;

    let client = reqwest::Client::new();
    for _ in 0..2 {
        let response = client.get(format!("{}/stock/tcs", base)).send().await?;
        assert_eq!(response.status(), 200);
        let body: Value = response.json().await?;
        assert_eq!(body["symbol"], "TCS");
        assert_eq!(body["current_price"], 3890.46);
        assert_eq!(body["52_week_high"], 4254.75);
        assert_eq!(body["pe_ratio"], "N/A");
        assert_eq!(body["sector"], "N/A");
    }

    quote_mock.assert_hits(1);
    Ok(())
}

#[tokio::test]
async fn test_rest_unknown_symbol_is_404() -> Result<()> {
    let fmp = MockServer::start();
    fmp.mock(|when, then| {
        when.method(GET).path("/api/v3/quote/NOPE");
        then.status(200).json_body(json!([]));
    });
    let base = spawn_server(&fmp).await?;

    let response = reqwest::get(format!("{}/stock/NOPE", base)).await?;
    assert_eq!(response.status(), 404);
    let body: Value = response.json().await?;
    assert_eq!(body["detail"], "Invalid response from API");
    Ok(())
}

#[tokio::test]
async fn test_mcp_historical_period_truncates() -> Result<()> {
    let fmp = MockServer::start();
    let historical: Vec<Value> = (0..10)
        .map(|i| json!({"date": format!("2024-03-{:02}", 20 - i), "close": 100.0 + i as f64}))
        .collect();
    fmp.mock(|when, then| {
        when.method(GET)
            .path("/api/v3/historical-price-full/INFY")
            .query_param("serietype", "line");
        then.status(200)
            .json_body(json!({"symbol": "INFY", "historical": historical}));
    });
    let base = spawn_server(&fmp).await?;

    let body: Value = reqwest::Client::new()
        .post(format!("{}/mcp", base))
        .json(&json!({"method": "get_historical_data", "params": {"symbol": "infy", "period": "5d"}}))
        .send()
        .await?
        .json()
        .await?;

    assert_eq!(body["success"], true);
    assert_eq!(body["method"], "get_historical_data");
    assert_eq!(body["data"]["symbol"], "INFY");
    let data = body["data"]["data"].as_array().unwrap();
    assert_eq!(data.len(), 5);
    assert_eq!(data[0]["date"], "2024-03-20");
    Ok(())
}

#[tokio::test]
async fn test_mcp_missing_param_envelope() -> Result<()> {
    let fmp = MockServer::start();
    let base = spawn_server(&fmp).await?;

    let response = reqwest::Client::new()
        .post(format!("{}/mcp", base))
        .json(&json!({"method": "get_stock_info", "params": {}}))
        .send()
        .await?;
    assert_eq!(response.status(), 200);

    let body: Value = response.json().await?;
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "Symbol is required");
    assert!(body.get("data").is_none());
    Ok(())
}

#[tokio::test]
async fn test_chat_end_to_end() -> Result<()> {
    let fmp = MockServer::start();
    mock_quote(&fmp, "TCS");
    mock_movers(&fmp);
    let base = spawn_server(&fmp).await?;

    let config = ChatConfig {
        server_url: base,
        ..ChatConfig::default()
    };
    let client = McpClient::new(&config)?;
    let mut session = ChatSession::new(ChatBot::new(Arc::new(client)), &config);

    match session.ask("What is the TCS price?").await {
        Reply::Stock(quote) => {
            assert_eq!(quote.symbol, "TCS");
            assert_eq!(quote.volume, Some(1_234_567));
        }
        other => panic!("expected a stock card, got {:?}", other),
    }

    match session.ask("show top gainers").await {
        Reply::Movers(movers) => {
            assert_eq!(movers.top_gainers.len(), 5);
            assert_eq!(movers.top_losers.len(), 5);
            assert_eq!(movers.top_losers[0].change_percent, -8.25);
            assert!(movers.timestamp.ends_with('Z'));
        }
        other => panic!("expected market movers, got {:?}", other),
    }

    // 歡迎訊息 + 兩輪問答
    assert_eq!(session.messages().len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_chat_reports_connection_errors() -> Result<()> {
    let config = ChatConfig {
        server_url: "http://127.0.0.1:9".to_string(),
        request_timeout: Duration::from_secs(2),
        ..ChatConfig::default()
    };
    let client = McpClient::new(&config)?;
    let mut session = ChatSession::new(ChatBot::new(Arc::new(client)), &config);

    match session.quick_lookup("reliance").await {
        Reply::Text(text) => assert!(text.starts_with("Connection error:")),
        other => panic!("expected an error text, got {:?}", other),
    }
    // 失敗的快捷查詢不進歷史
    assert_eq!(session.messages().len(), 1);

    // 自然語句查詢失敗時改用提示文字
    let reply = session.ask("RELIANCE price").await;
    assert_eq!(
        reply,
        &Reply::Text("Please specify a valid stock symbol (e.g., RELIANCE, TCS, INFY)".to_string())
    );
    Ok(())
}
