//! 印度市場慣用的數字格式（Lakh / Crore）與交易時段判斷

use chrono::{DateTime, Duration, Timelike, Utc};
use std::fmt;

const LAKH: f64 = 100_000.0;
const CRORE: f64 = 10_000_000.0;
const THOUSAND_CRORE: f64 = 10_000_000_000.0;
const LAKH_CRORE: f64 = 10_000_000_000_000.0;

/// IST = UTC+05:30
const IST_OFFSET_MINUTES: i64 = 330;
const MARKET_OPEN_SECS: u32 = 9 * 3600 + 15 * 60;
const MARKET_CLOSE_SECS: u32 = 15 * 3600 + 30 * 60;

pub const NOT_AVAILABLE: &str = "N/A";

/// 四捨五入到小數點後兩位
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_currency(amount: Option<f64>) -> String {
    let Some(amount) = amount else {
        return NOT_AVAILABLE.to_string();
    };

    if amount >= CRORE {
        format!("₹{:.2} Cr", amount / CRORE)
    } else if amount >= LAKH {
        format!("₹{:.2} L", amount / LAKH)
    } else {
        format!("₹{}", group_thousands(amount, 2))
    }
}

pub fn format_percentage(percent: Option<f64>) -> String {
    match percent {
        Some(p) if p > 0.0 => format!("+{:.2}%", p),
        Some(p) => format!("{:.2}%", p),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_market_cap(market_cap: Option<f64>) -> String {
    let Some(cap) = market_cap else {
        return NOT_AVAILABLE.to_string();
    };

    if cap >= LAKH_CRORE {
        format!("₹{:.2} L Cr", cap / LAKH_CRORE)
    } else if cap >= THOUSAND_CRORE {
        format!("₹{:.2} K Cr", cap / THOUSAND_CRORE)
    } else if cap >= CRORE {
        format!("₹{:.2} Cr", cap / CRORE)
    } else {
        format!("₹{:.2} L", cap / LAKH)
    }
}

pub fn format_volume(volume: Option<u64>) -> String {
    match volume {
        Some(v) => group_thousands(v as f64, 0),
        None => NOT_AVAILABLE.to_string(),
    }
}

pub fn format_price(price: Option<f64>) -> String {
    match price {
        Some(p) => format!("₹{:.2}", p),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// 以逗號分隔千位，例如 12345.678 -> "12,345.68"
fn group_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };

    match frac_part {
        Some(frac) => format!("{}{}.{}", sign, grouped, frac),
        None => format!("{}{}", sign, grouped),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarketStatus {
    Open,
    Closed,
}

impl fmt::Display for MarketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketStatus::Open => write!(f, "OPEN"),
            MarketStatus::Closed => write!(f, "CLOSED"),
        }
    }
}

/// NSE/BSE 現貨時段 09:15–15:30 IST（含兩端）
pub fn market_status(now: DateTime<Utc>) -> MarketStatus {
    let ist = now.naive_utc() + Duration::minutes(IST_OFFSET_MINUTES);
    let secs = ist.time().num_seconds_from_midnight();

    if (MARKET_OPEN_SECS..=MARKET_CLOSE_SECS).contains(&secs) {
        MarketStatus::Open
    } else {
        MarketStatus::Closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_currency_uses_indian_units() {
        assert_eq!(format_currency(Some(25_000_000.0)), "₹2.50 Cr");
        assert_eq!(format_currency(Some(150_000.0)), "₹1.50 L");
        assert_eq!(format_currency(Some(12_345.678)), "₹12,345.68");
        assert_eq!(format_currency(Some(999.5)), "₹999.50");
        assert_eq!(format_currency(None), "N/A");
    }

    #[test]
    fn test_format_percentage_sign() {
        assert_eq!(format_percentage(Some(1.234)), "+1.23%");
        assert_eq!(format_percentage(Some(-0.5)), "-0.50%");
        assert_eq!(format_percentage(Some(0.0)), "0.00%");
        assert_eq!(format_percentage(None), "N/A");
    }

    #[test]
    fn test_format_market_cap_scales() {
        assert_eq!(format_market_cap(Some(19_000_000_000_000.0)), "₹1.90 L Cr");
        assert_eq!(format_market_cap(Some(45_000_000_000.0)), "₹4.50 K Cr");
        assert_eq!(format_market_cap(Some(30_000_000.0)), "₹3.00 Cr");
        assert_eq!(format_market_cap(Some(500_000.0)), "₹5.00 L");
        assert_eq!(format_market_cap(None), "N/A");
    }

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(1_234_567.0, 0), "1,234,567");
        assert_eq!(group_thousands(-1_234.5, 2), "-1,234.50");
        assert_eq!(group_thousands(12.0, 0), "12");
        assert_eq!(format_volume(Some(9_876_543)), "9,876,543");
    }

    #[test]
    fn test_market_status_in_ist() {
        // 03:45 UTC = 09:15 IST
        let open = Utc.with_ymd_and_hms(2024, 3, 4, 3, 45, 0).unwrap();
        assert_eq!(market_status(open), MarketStatus::Open);

        // 10:00 UTC = 15:30 IST
        let close = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 0).unwrap();
        assert_eq!(market_status(close), MarketStatus::Open);

        let after = Utc.with_ymd_and_hms(2024, 3, 4, 10, 0, 1).unwrap();
        assert_eq!(market_status(after), MarketStatus::Closed);

        let before = Utc.with_ymd_and_hms(2024, 3, 4, 3, 44, 59).unwrap();
        assert_eq!(market_status(before), MarketStatus::Closed);
        assert_eq!(MarketStatus::Closed.to_string(), "CLOSED");
    }
}
