//! Watchlist data structures matching the Investment Hub backend's JSON.
//!
//! The backend stores decimals as strings and numbers interchangeably, so
//! the price and quantity fields use a lenient deserializer.

use serde::{Deserialize, Deserializer, Serialize};

/// Accepts `12.5`, `"12.5"`, or null (mapped to 0.0).
fn lenient_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    match value {
        serde_json::Value::Number(n) => n.as_f64().ok_or_else(|| {
            serde::de::Error::custom(format!("number out of f64 range: {}", n))
        }),
        serde_json::Value::String(s) => s
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid decimal string: {:?}", s))),
        serde_json::Value::Null => Ok(0.0),
        other => Err(serde::de::Error::custom(format!(
            "expected number or string, got {}",
            other
        ))),
    }
}

/// One owned position on the watchlist.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct WatchlistItem {
    pub id: i64,
    pub stock_symbol: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub quantity: f64,
    /// Price paid per share at purchase time.
    #[serde(deserialize_with = "lenient_f64")]
    pub price_at_time: f64,
    /// Purchase date, ISO 8601 as the backend sends it.
    #[serde(default)]
    pub added_at: Option<String>,
    #[serde(default)]
    pub industry: Option<String>,
    /// Entered by hand rather than through a price lookup.
    #[serde(default)]
    pub manual: bool,
}

impl WatchlistItem {
    /// Amount paid for this position.
    pub fn invested(&self) -> f64 {
        self.price_at_time * self.quantity
    }

    /// Purchase date truncated to the day, for display.
    pub fn added_date(&self) -> &str {
        match &self.added_at {
            Some(date) => date.split('T').next().unwrap_or(date),
            None => "",
        }
    }
}

/// `GET /watchlist` body: the items plus the backend's invested total.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchlistResponse {
    pub watchlist: Vec<WatchlistItem>,
    #[serde(deserialize_with = "lenient_f64", default)]
    pub total: f64,
}

/// `POST /watchlist` body. Quote-based adds send only symbol and quantity;
/// manual adds carry the full position.
#[derive(Debug, Clone, Serialize)]
pub struct NewWatchlistItem {
    pub stock_symbol: String,
    pub quantity: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_at_time: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub manual: bool,
}

impl NewWatchlistItem {
    pub fn from_quote(symbol: impl Into<String>, quantity: f64) -> Self {
        Self {
            stock_symbol: symbol.into(),
            quantity,
            price_at_time: None,
            added_at: None,
            industry: None,
            manual: false,
        }
    }

    pub fn manual(
        symbol: impl Into<String>,
        quantity: f64,
        price_at_time: f64,
        added_at: impl Into<String>,
        industry: Option<String>,
    ) -> Self {
        Self {
            stock_symbol: symbol.into().to_uppercase(),
            quantity,
            price_at_time: Some(price_at_time),
            added_at: Some(added_at.into()),
            industry,
            manual: true,
        }
    }
}

/// `PUT /watchlist/{id}` body. Only the editable fields.
#[derive(Debug, Clone, Serialize)]
pub struct WatchlistUpdate {
    pub quantity: f64,
    pub price_at_time: f64,
    pub added_at: Option<String>,
}

/// Column the watchlist table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WatchlistSort {
    #[default]
    Symbol,
    Price,
    Quantity,
    AddedAt,
}

impl WatchlistSort {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Symbol => "Symbol",
            Self::Price => "Price",
            Self::Quantity => "Quantity",
            Self::AddedAt => "Date Added",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Symbol => Self::Price,
            Self::Price => Self::Quantity,
            Self::Quantity => Self::AddedAt,
            Self::AddedAt => Self::Symbol,
        }
    }
}

/// Sort items in place by the given column. Ties keep their server order.
pub fn sort_watchlist(items: &mut [WatchlistItem], sort: WatchlistSort, ascending: bool) {
    items.sort_by(|a, b| {
        let ordering = match sort {
            WatchlistSort::Symbol => a.stock_symbol.cmp(&b.stock_symbol),
            WatchlistSort::Price => a
                .price_at_time
                .partial_cmp(&b.price_at_time)
                .unwrap_or(std::cmp::Ordering::Equal),
            WatchlistSort::Quantity => a
                .quantity
                .partial_cmp(&b.quantity)
                .unwrap_or(std::cmp::Ordering::Equal),
            WatchlistSort::AddedAt => a.added_at.cmp(&b.added_at),
        };
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, symbol: &str, quantity: f64, price: f64, added: &str) -> WatchlistItem {
        WatchlistItem {
            id,
            stock_symbol: symbol.to_string(),
            quantity,
            price_at_time: price,
            added_at: Some(added.to_string()),
            industry: None,
            manual: false,
        }
    }

    #[test]
    fn test_item_parses_string_decimals() {
        let json = r#"{
            "id": 7,
            "stock_symbol": "AAPL",
            "quantity": "2.5",
            "price_at_time": "150.10",
            "added_at": "2025-03-01T09:30:00.000Z"
        }"#;
        let item: WatchlistItem = serde_json::from_str(json).expect("parse item");
        assert_eq!(item.quantity, 2.5);
        assert_eq!(item.price_at_time, 150.10);
        assert_eq!(item.added_date(), "2025-03-01");
        assert!(!item.manual);
    }

    #[test]
    fn test_item_parses_numeric_fields() {
        let json = r#"{"id":1,"stock_symbol":"MSFT","quantity":3,"price_at_time":410.2,"manual":true}"#;
        let item: WatchlistItem = serde_json::from_str(json).expect("parse item");
        assert_eq!(item.quantity, 3.0);
        assert_eq!(item.invested(), 3.0 * 410.2);
        assert!(item.manual);
        assert_eq!(item.added_date(), "");
    }

    #[test]
    fn test_response_total_defaults_to_zero() {
        let json = r#"{"watchlist":[]}"#;
        let response: WatchlistResponse = serde_json::from_str(json).expect("parse response");
        assert_eq!(response.total, 0.0);
        assert!(response.watchlist.is_empty());
    }

    #[test]
    fn test_quote_add_omits_manual_fields() {
        let body = serde_json::to_value(NewWatchlistItem::from_quote("AAPL", 2.0))
            .expect("encode item");
        assert_eq!(
            body,
            serde_json::json!({"stock_symbol": "AAPL", "quantity": 2.0})
        );
    }

    #[test]
    fn test_manual_add_uppercases_and_flags() {
        let body = serde_json::to_value(NewWatchlistItem::manual(
            "tsla",
            1.0,
            250.0,
            "2025-06-01",
            Some("Automotive".to_string()),
        ))
        .expect("encode item");
        assert_eq!(body["stock_symbol"], "TSLA");
        assert_eq!(body["manual"], true);
        assert_eq!(body["price_at_time"], 250.0);
    }

    #[test]
    fn test_sort_by_symbol_and_reverse() {
        let mut items = vec![
            item(1, "MSFT", 1.0, 400.0, "2025-01-02"),
            item(2, "AAPL", 2.0, 150.0, "2025-01-03"),
            item(3, "GOOG", 3.0, 170.0, "2025-01-01"),
        ];
        sort_watchlist(&mut items, WatchlistSort::Symbol, true);
        let symbols: Vec<&str> = items.iter().map(|i| i.stock_symbol.as_str()).collect();
        assert_eq!(symbols, ["AAPL", "GOOG", "MSFT"]);

        sort_watchlist(&mut items, WatchlistSort::AddedAt, false);
        let symbols: Vec<&str> = items.iter().map(|i| i.stock_symbol.as_str()).collect();
        assert_eq!(symbols, ["AAPL", "MSFT", "GOOG"]);
    }

    #[test]
    fn test_sort_cycle_visits_all_columns() {
        let mut sort = WatchlistSort::default();
        let mut seen = vec![sort];
        for _ in 0..3 {
            sort = sort.next();
            seen.push(sort);
        }
        assert_eq!(sort.next(), WatchlistSort::Symbol);
        assert_eq!(seen.len(), 4);
    }
}
