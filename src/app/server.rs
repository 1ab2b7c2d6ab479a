//! REST + MCP HTTP surface for the stock data service

use crate::core::mcp;
use crate::core::stock_data::DEFAULT_PERIOD;
use crate::domain::model::{
    HistoricalSeries, MarketMovers, McpRequest, McpResponse, SearchHit, StockQuote,
};
use crate::domain::ports::StockApi;
use crate::utils::error::{ErrorCategory, StockError};
use crate::utils::format::market_status;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared API state
#[derive(Clone)]
pub struct AppState {
    pub api: Arc<dyn StockApi>,
}

impl AppState {
    pub fn new(api: Arc<dyn StockApi>) -> Self {
        Self { api }
    }
}

/// REST 失敗時的回應：`{"detail": "..."}`
pub struct ApiError(StockError);

impl From<StockError> for ApiError {
    fn from(err: StockError) -> Self {
        ApiError(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0.category() {
            ErrorCategory::Request => StatusCode::BAD_REQUEST,
            _ => StatusCode::NOT_FOUND,
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<T>, ApiError>;

#[derive(Debug, Deserialize)]
pub struct HistoricalParams {
    period: Option<String>,
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/mcp", post(mcp_handler))
        .route("/stock/:symbol", get(stock_handler))
        .route("/historical/:symbol", get(historical_handler))
        .route("/market/movers", get(movers_handler))
        .route("/market/status", get(status_handler))
        .route("/search/:query", get(search_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// 綁定位址並服務到收到關閉訊號為止
pub async fn serve(bind_address: &str, app: Router) -> crate::utils::error::Result<()> {
    let listener = TcpListener::bind(bind_address).await?;
    tracing::info!("🚀 MCP server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("MCP server stopped");
    Ok(())
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}

async fn root_handler() -> Json<Value> {
    Json(json!({
        "message": "Indian Stock Market MCP Server",
        "status": "running"
    }))
}

async fn mcp_handler(
    State(state): State<AppState>,
    Json(request): Json<McpRequest>,
) -> Json<McpResponse> {
    Json(mcp::dispatch(state.api.as_ref(), &request).await)
}

async fn stock_handler(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
) -> ApiResult<StockQuote> {
    Ok(Json(state.api.get_stock_info(&symbol).await?))
}

async fn historical_handler(
    State(state): State<AppState>,
    Path(symbol): Path<String>,
    Query(params): Query<HistoricalParams>,
) -> ApiResult<HistoricalSeries> {
    let period = params.period.as_deref().unwrap_or(DEFAULT_PERIOD);
    Ok(Json(state.api.get_historical_data(&symbol, period).await?))
}

async fn movers_handler(
    State(state): State<AppState>,
) -> ApiResult<MarketMovers> {
    Ok(Json(state.api.get_market_movers().await?))
}

async fn status_handler() -> Json<Value> {
    let now = chrono::Utc::now();
    Json(json!({
        "market": "NSE",
        "status": market_status(now).to_string(),
        "timestamp": now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
    }))
}

async fn search_handler(
    State(state): State<AppState>,
    Path(query): Path<String>,
) -> ApiResult<Vec<SearchHit>> {
    Ok(Json(state.api.search_stocks(&query).await?))
}
