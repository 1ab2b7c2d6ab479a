use clap::Parser;
use std::io::Write;
use std::sync::Arc;
use stock_mcp::app::chat::{ChatBot, ChatSession, Reply};
use stock_mcp::app::render;
use stock_mcp::config::cli::ChatArgs;
use stock_mcp::utils::logger;
use stock_mcp::utils::validation::{self, Validate};
use stock_mcp::{LocalStorage, McpClient};
use tokio::io::{AsyncBufReadExt, BufReader};

const COMMANDS: &str =
    "Commands: /movers, /stock SYMBOL, /popular [N|SYMBOL], /history, /help, /quit";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let args = ChatArgs::parse();

    // 輸出走 stdout，日誌走 stderr
    logger::init_stderr_logger(args.verbose);

    let config = args.to_config();
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 {}", e.recovery_suggestion());
        std::process::exit(e.severity().exit_code());
    }
    if let Some(dir) = &args.export_dir {
        validation::validate_path("export_dir", &dir.to_string_lossy())?;
    }

    let client = McpClient::new(&config)?;
    let mut session = ChatSession::new(ChatBot::new(Arc::new(client)), &config);
    let storage = args
        .export_dir
        .as_ref()
        .map(|dir| LocalStorage::new(dir.to_string_lossy().to_string()));

    if let Some(query) = &args.query {
        let reply = session.ask(query).await.clone();
        println!("{}", render::reply(&reply));
        export_if_chart(storage.as_ref(), &reply).await;
        return Ok(());
    }

    println!("📈 Indian Stock Market Chatbot");
    if let Some(welcome) = session.messages().first() {
        println!("{}", render::reply(&welcome.reply));
    }
    println!("{}", COMMANDS);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let reply = match line.split_once(' ').unwrap_or((line, "")) {
            ("/quit" | "/exit", _) => break,
            ("/help", _) => {
                println!("{}", COMMANDS);
                continue;
            }
            ("/history", _) => {
                for message in session.messages() {
                    println!("{}", render::message(message));
                }
                continue;
            }
            ("/popular", choice) if !choice.trim().is_empty() => {
                let Some(symbol) = session.popular_pick(choice).map(str::to_string) else {
                    println!("Not a popular stock: {}", choice.trim());
                    continue;
                };
                session.quick_lookup(&symbol).await
            }
            ("/popular", _) => {
                for (i, symbol) in session.popular_stocks().iter().enumerate() {
                    println!("  {}. {}", i + 1, symbol);
                }
                continue;
            }
            ("/movers", _) => session.quick_movers().await,
            ("/stock", symbol) if !symbol.trim().is_empty() => session.quick_lookup(symbol).await,
            ("/stock", _) => {
                println!("Usage: /stock SYMBOL");
                continue;
            }
            _ => session.ask(line).await.clone(),
        };

        println!("{}", render::reply(&reply));
        export_if_chart(storage.as_ref(), &reply).await;
    }

    println!("Bye!");
    Ok(())
}

async fn export_if_chart(storage: Option<&LocalStorage>, reply: &Reply) {
    let (Some(storage), Reply::Chart(series)) = (storage, reply) else {
        return;
    };

    match render::export_chart_csv(storage, series).await {
        Ok(path) => println!("📁 Chart data saved to: {}", path),
        Err(e) => eprintln!("❌ Failed to save chart data: {}", e.user_friendly_message()),
    }
}
