//! 終端機聊天助理：把自然語句對應到股票查詢

use crate::config::ChatConfig;
use crate::core::stock_data::DEFAULT_PERIOD;
use crate::domain::model::{HistoricalSeries, MarketMovers, SearchHit, StockQuote};
use crate::domain::ports::StockApi;
use crate::utils::error::StockError;
use std::sync::Arc;

pub const NO_SYMBOL_TEXT: &str = "Please specify a valid stock symbol (e.g., RELIANCE, TCS, INFY)";
pub const NO_CHART_SYMBOL_TEXT: &str = "Please specify a valid stock symbol for the chart";
pub const MOVERS_FAILED_TEXT: &str = "Sorry, couldn't fetch market movers data";
pub const SEARCH_FAILED_TEXT: &str = "Sorry, couldn't search for stocks";
pub const HELP_TEXT: &str = "I can help you with:\n- Stock prices (e.g., 'RELIANCE price')\n- Stock charts (e.g., 'TCS chart')\n- Market movers (e.g., 'top gainers')\n- Stock search (e.g., 'search banking')";

const QUOTE_KEYWORDS: &[&str] = &["price", "quote"];
const CHART_KEYWORDS: &[&str] = &["chart", "historical", "graph"];
const MOVERS_KEYWORDS: &[&str] = &["gainers", "losers", "movers"];
const SEARCH_KEYWORDS: &[&str] = &["search", "find"];

// 常見英文虛詞，不當作代號候選
const STOPWORDS: &[&str] = &[
    "the", "and", "for", "what", "whats", "show", "get", "give", "tell", "about", "stock",
    "stocks", "share", "shares", "today", "current", "how", "much", "please", "top",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    Quote(Vec<String>),
    Chart(Vec<String>),
    Movers,
    Search(String),
    Help,
}

/// 依關鍵字判斷意圖，優先序：報價、圖表、漲跌榜、搜尋
pub fn classify(query: &str) -> Intent {
    let lower = query.to_lowercase();
    let mentions = |keywords: &[&str]| keywords.iter().any(|k| lower.contains(k));

    if mentions(QUOTE_KEYWORDS) {
        Intent::Quote(symbol_candidates(query))
    } else if mentions(CHART_KEYWORDS) {
        Intent::Chart(symbol_candidates(query))
    } else if mentions(MOVERS_KEYWORDS) {
        Intent::Movers
    } else if mentions(SEARCH_KEYWORDS) {
        match query.split_whitespace().last() {
            Some(term) => Intent::Search(term.to_string()),
            None => Intent::Help,
        }
    } else {
        Intent::Help
    }
}

/// 長度至少 3 的純字母詞，依出現順序
pub fn symbol_candidates(query: &str) -> Vec<String> {
    query
        .split_whitespace()
        .map(|word| word.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|word| word.chars().count() >= 3 && word.chars().all(|c| c.is_ascii_alphabetic()))
        .filter(|word| {
            let lower = word.to_lowercase();
            !STOPWORDS.contains(&lower.as_str())
                && !QUOTE_KEYWORDS
                    .iter()
                    .chain(CHART_KEYWORDS)
                    .chain(MOVERS_KEYWORDS)
                    .chain(SEARCH_KEYWORDS)
                    .any(|k| *k == lower)
        })
        .map(|word| word.to_uppercase())
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Text(String),
    Stock(StockQuote),
    Chart(HistoricalSeries),
    Movers(MarketMovers),
    Search(Vec<SearchHit>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub reply: Reply,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            reply: Reply::Text(text.into()),
        }
    }

    pub fn assistant(reply: Reply) -> Self {
        Self {
            role: Role::Assistant,
            reply,
        }
    }
}

pub struct ChatBot {
    api: Arc<dyn StockApi>,
}

impl ChatBot {
    pub fn new(api: Arc<dyn StockApi>) -> Self {
        Self { api }
    }

    pub async fn respond(&self, query: &str) -> Reply {
        match classify(query) {
            Intent::Quote(candidates) => {
                for symbol in candidates {
                    match self.api.get_stock_info(&symbol).await {
                        Ok(quote) => return Reply::Stock(quote),
                        Err(e) => tracing::debug!("No quote for {}: {}", symbol, e),
                    }
                }
                Reply::Text(NO_SYMBOL_TEXT.to_string())
            }
            Intent::Chart(candidates) => {
                for symbol in candidates {
                    match self.api.get_historical_data(&symbol, DEFAULT_PERIOD).await {
                        Ok(series) => return Reply::Chart(series),
                        Err(e) => tracing::debug!("No history for {}: {}", symbol, e),
                    }
                }
                Reply::Text(NO_CHART_SYMBOL_TEXT.to_string())
            }
            Intent::Movers => match self.api.get_market_movers().await {
                Ok(movers) => Reply::Movers(movers),
                Err(e) => {
                    tracing::warn!("Market movers failed: {}", e);
                    Reply::Text(MOVERS_FAILED_TEXT.to_string())
                }
            },
            Intent::Search(term) => match self.api.search_stocks(&term).await {
                Ok(hits) => Reply::Search(hits),
                Err(e) => {
                    tracing::warn!("Search for '{}' failed: {}", term, e);
                    Reply::Text(SEARCH_FAILED_TEXT.to_string())
                }
            },
            Intent::Help => Reply::Text(HELP_TEXT.to_string()),
        }
    }

    pub async fn lookup(&self, symbol: &str) -> Reply {
        match self.api.get_stock_info(symbol).await {
            Ok(quote) => Reply::Stock(quote),
            Err(e) => Reply::Text(failure_text(&e)),
        }
    }

    pub async fn movers(&self) -> Reply {
        match self.api.get_market_movers().await {
            Ok(movers) => Reply::Movers(movers),
            Err(e) => Reply::Text(failure_text(&e)),
        }
    }
}

/// 連線層失敗加上 `Connection error:` 前綴，其餘照錯誤訊息
pub fn failure_text(err: &StockError) -> String {
    match err {
        StockError::ApiError(e) => format!("Connection error: {}", e),
        other => other.to_string(),
    }
}

/// 一次對話：歡迎訊息開頭，歷史只保留最後 `max_messages` 則
pub struct ChatSession {
    bot: ChatBot,
    messages: Vec<Message>,
    max_messages: usize,
    popular_stocks: Vec<String>,
}

impl ChatSession {
    pub fn new(bot: ChatBot, config: &ChatConfig) -> Self {
        let mut session = Self {
            bot,
            messages: Vec::new(),
            max_messages: config.max_messages.max(1),
            popular_stocks: config.popular_stocks.clone(),
        };
        session.push(Message::assistant(Reply::Text(
            config.welcome_message.clone(),
        )));
        session
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn popular_stocks(&self) -> &[String] {
        &self.popular_stocks
    }

    pub async fn ask(&mut self, query: &str) -> &Reply {
        self.push(Message::user(query));
        let reply = self.bot.respond(query).await;
        self.push_reply(reply)
    }

    /// 熱門股清單中的代號：可用 1 起算的序號或代號本身
    pub fn popular_pick(&self, choice: &str) -> Option<&str> {
        let choice = choice.trim();
        if let Ok(n) = choice.parse::<usize>() {
            return n
                .checked_sub(1)
                .and_then(|idx| self.popular_stocks.get(idx))
                .map(String::as_str);
        }
        self.popular_stocks
            .iter()
            .find(|s| s.eq_ignore_ascii_case(choice))
            .map(String::as_str)
    }

    /// 側邊快捷：漲跌榜
    pub async fn quick_movers(&mut self) -> Reply {
        let reply = self.bot.movers().await;
        self.record_quick("Show market movers".to_string(), &reply);
        reply
    }

    /// 側邊快捷：單一代號查詢
    pub async fn quick_lookup(&mut self, symbol: &str) -> Reply {
        let symbol = symbol.trim().to_uppercase();
        let reply = self.bot.lookup(&symbol).await;
        self.record_quick(format!("Get info for {}", symbol), &reply);
        reply
    }

    // 快捷查詢失敗時不寫入歷史
    fn record_quick(&mut self, prompt: String, reply: &Reply) {
        if matches!(reply, Reply::Text(_)) {
            return;
        }
        self.push(Message::user(prompt));
        self.push(Message::assistant(reply.clone()));
    }

    fn push_reply(&mut self, reply: Reply) -> &Reply {
        self.push(Message::assistant(reply));
        // push 之後至少有一則
        &self.messages[self.messages.len() - 1].reply
    }

    fn push(&mut self, message: Message) {
        self.messages.push(message);
        if self.messages.len() > self.max_messages {
            let excess = self.messages.len() - self.max_messages;
            self.messages.drain(..excess);
        }
    }
}
