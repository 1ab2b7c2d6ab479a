use crate::app::chat::{Message, Reply, Role};
use crate::domain::model::{HistoricalSeries, MarketMovers, SearchHit, StockQuote};
use crate::domain::ports::Storage;
use crate::utils::error::{Result, StockError};
use crate::utils::format::{
    format_currency, format_market_cap, format_percentage, format_price, format_volume,
    NOT_AVAILABLE,
};
use std::fmt::Write;

const SPARK_BARS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

pub fn reply(reply: &Reply) -> String {
    match reply {
        Reply::Text(text) => text.clone(),
        Reply::Stock(quote) => stock_card(quote),
        Reply::Chart(series) => chart(series),
        Reply::Movers(movers) => market_movers(movers),
        Reply::Search(hits) => search_results(hits),
    }
}

pub fn message(message: &Message) -> String {
    let who = match message.role {
        Role::User => "you",
        Role::Assistant => "bot",
    };
    format!("[{}] {}", who, reply(&message.reply))
}

pub fn stock_card(quote: &StockQuote) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} - {}", quote.symbol, quote.company_name);
    let _ = writeln!(
        out,
        "  Price:      {}  {:+.2} ({})",
        format_currency(Some(quote.current_price)),
        quote.change,
        format_percentage(Some(quote.change_percent))
    );
    let _ = writeln!(
        out,
        "  Prev close: {}",
        format_currency(Some(quote.previous_close))
    );
    let _ = writeln!(out, "  Market Cap: {}", format_market_cap(quote.market_cap));
    let _ = writeln!(out, "  Volume:     {}", format_volume(quote.volume));
    let _ = writeln!(
        out,
        "  P/E Ratio:  {}",
        quote
            .pe_ratio
            .map(|pe| format!("{:.2}", pe))
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    );
    let _ = writeln!(out, "  52W High:   {}", format_price(quote.week_52_high));
    let _ = writeln!(out, "  52W Low:    {}", format_price(quote.week_52_low));
    let _ = write!(
        out,
        "  Sector:     {}",
        quote.sector.as_deref().unwrap_or(NOT_AVAILABLE)
    );
    out
}

/// 收盤價走勢，最舊的在左
pub fn sparkline(closes: &[f64]) -> String {
    let (min, max) = closes
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &c| {
            (lo.min(c), hi.max(c))
        });
    let span = max - min;

    closes
        .iter()
        .map(|&c| {
            if span <= f64::EPSILON {
                SPARK_BARS[SPARK_BARS.len() / 2]
            } else {
                let idx = ((c - min) / span * (SPARK_BARS.len() - 1) as f64).round() as usize;
                SPARK_BARS[idx.min(SPARK_BARS.len() - 1)]
            }
        })
        .collect()
}

pub fn chart(series: &HistoricalSeries) -> String {
    let mut out = format!("{} - Stock Price Chart ({})\n", series.symbol, series.period);

    if series.data.is_empty() {
        out.push_str("  no data");
        return out;
    }

    // 上游資料是最新的在前
    let chronological: Vec<_> = series.data.iter().rev().collect();
    let closes: Vec<f64> = chronological.iter().map(|p| p.close).collect();
    let _ = writeln!(out, "  {}", sparkline(&closes));
    let _ = writeln!(out, "  {:<12} {:>12}", "Date", "Close (₹)");
    for point in &chronological {
        let _ = writeln!(out, "  {:<12} {:>12.2}", point.date, point.close);
    }
    out.truncate(out.trim_end().len());
    out
}

pub fn market_movers(movers: &MarketMovers) -> String {
    let mut out = String::from("🚀 Top Gainers\n");
    for stock in &movers.top_gainers {
        let _ = writeln!(
            out,
            "  {:<10} ₹{:<10.2} ({})",
            stock.symbol,
            stock.current_price,
            format_percentage(Some(stock.change_percent))
        );
    }
    out.push_str("📉 Top Losers\n");
    for stock in &movers.top_losers {
        let _ = writeln!(
            out,
            "  {:<10} ₹{:<10.2} ({})",
            stock.symbol,
            stock.current_price,
            format_percentage(Some(stock.change_percent))
        );
    }
    let _ = write!(out, "as of {}", movers.timestamp);
    out
}

pub fn search_results(hits: &[SearchHit]) -> String {
    if hits.is_empty() {
        return "No matching stocks found".to_string();
    }

    let mut out = String::from("Search Results:");
    for hit in hits {
        let _ = write!(
            out,
            "\n• {} - {} ({})",
            hit.symbol,
            hit.company_name,
            hit.exchange.as_deref().unwrap_or(NOT_AVAILABLE)
        );
    }
    out
}

/// 把圖表資料寫成 `{SYMBOL}_{period}.csv`，回傳相對路徑
pub async fn export_chart_csv<S: Storage>(storage: &S, series: &HistoricalSeries) -> Result<String> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["date", "close"])?;
    for point in series.data.iter().rev() {
        let close = format!("{:.2}", point.close);
        writer.write_record([point.date.as_str(), close.as_str()])?;
    }
    let data = writer
        .into_inner()
        .map_err(|e| StockError::IoError(e.into_error()))?;

    let path = format!("{}_{}.csv", series.symbol, series.period);
    storage.write_file(&path, &data).await?;
    tracing::info!("Chart exported to {}", path);
    Ok(path)
}
