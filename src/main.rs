use clap::Parser;
use std::sync::Arc;
use stock_mcp::app::server::{self, AppState};
use stock_mcp::config::cli::ServerArgs;
use stock_mcp::utils::error::StockError;
use stock_mcp::utils::logger;
use stock_mcp::{FmpClient, ServerConfig, StockDataService};

#[tokio::main]
async fn main() {
    // .env 不存在也無妨
    let _ = dotenvy::dotenv();

    let args = ServerArgs::parse();
    let config = args.load_config();

    // 初始化日誌，TOML 也可以要求 JSON 輸出
    let json_logs = config.as_ref().map_or(args.json_logs, |c| c.json_logs);
    if json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting stock-mcp server");
    if let Some(path) = &args.config {
        tracing::info!("📁 Configuration file: {}", path.display());
    }

    let result = match config {
        Ok(config) => run(config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        report_and_exit(e);
    }
}

async fn run(config: ServerConfig) -> stock_mcp::Result<()> {
    tracing::info!("✅ Configuration loaded and validated successfully");
    tracing::debug!(
        "Upstream: {} (api key {})",
        config.base_url,
        if config.api_key.is_some() { "set" } else { "missing" }
    );
    if config.api_key.is_none() {
        tracing::warn!("FMP_API_KEY is not set; upstream requests will likely be rejected");
    }

    let source = FmpClient::new(&config)?;
    let service = Arc::new(StockDataService::new(
        Arc::new(source),
        &config.rate_limits,
        &config.cache,
    ));
    let app = server::create_app(AppState::new(service.clone()));

    server::serve(&config.bind_address(), app).await?;

    let stats = service.cache_stats();
    tracing::info!(
        "Quote cache: {} hits, {} misses, {} entries",
        stats.hits,
        stats.misses,
        stats.entries
    );
    Ok(())
}

fn report_and_exit(e: StockError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Server failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());

    // 伺服器無法啟動時不回報成功
    std::process::exit(e.severity().exit_code().max(1));
}
