//! Market data structures matching the Polygon-style API's JSON.

use serde::Deserialize;

/// One row from ticker search.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct TickerMatch {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub primary_exchange: Option<String>,
}

/// Reference details for a single ticker.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerDetails {
    pub ticker: String,
    pub name: String,
    #[serde(default)]
    pub market_cap: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage_url: Option<String>,
    #[serde(default)]
    pub sic_description: Option<String>,
}

/// Previous trading day's bar. Shares the aggregate field scheme.
pub type PrevClose = AggBar;

/// One OHLCV aggregate bar. The API uses single-letter field names.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq)]
pub struct AggBar {
    /// Open price.
    pub o: f64,
    /// High price.
    pub h: f64,
    /// Low price.
    pub l: f64,
    /// Close price.
    pub c: f64,
    /// Volume.
    pub v: f64,
    /// Window start, Unix milliseconds.
    pub t: i64,
}

impl AggBar {
    /// Close-over-open change for this bar, as a fraction.
    pub fn change(&self) -> f64 {
        if self.o == 0.0 {
            0.0
        } else {
            (self.c - self.o) / self.o
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsPublisher {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub publisher: NewsPublisher,
    pub published_utc: String,
    #[serde(default)]
    pub article_url: Option<String>,
}

/// `/v1/marketstatus/now` body, reduced to the field the dashboard shows.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct MarketStatus {
    pub market: String,
}

impl MarketStatus {
    pub fn is_open(&self) -> bool {
        self.market == "open"
    }
}

/// Chart lookback windows with their aggregate granularity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryRange {
    #[default]
    FiveDays,
    ThirtyDays,
    ThreeMonths,
    SixMonths,
    OneYear,
    TwoYears,
    FiveYears,
    TenYears,
}

impl HistoryRange {
    pub const ALL: [HistoryRange; 8] = [
        Self::FiveDays,
        Self::ThirtyDays,
        Self::ThreeMonths,
        Self::SixMonths,
        Self::OneYear,
        Self::TwoYears,
        Self::FiveYears,
        Self::TenYears,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::FiveDays => "Last 5 Days",
            Self::ThirtyDays => "Last 30 Days",
            Self::ThreeMonths => "Last 3 Months",
            Self::SixMonths => "Last 6 Months",
            Self::OneYear => "Last Year",
            Self::TwoYears => "Last 2 Years",
            Self::FiveYears => "Last 5 Years",
            Self::TenYears => "Last 10 Years",
        }
    }

    pub fn lookback_days(&self) -> i64 {
        match self {
            Self::FiveDays => 5,
            Self::ThirtyDays => 30,
            Self::ThreeMonths => 90,
            Self::SixMonths => 180,
            Self::OneYear => 365,
            Self::TwoYears => 730,
            Self::FiveYears => 1825,
            Self::TenYears => 3650,
        }
    }

    /// Aggregate window unit: finer bars for short ranges, coarser for long.
    pub fn timespan(&self) -> &'static str {
        match self {
            Self::FiveDays | Self::ThirtyDays => "day",
            Self::ThreeMonths | Self::SixMonths => "week",
            Self::OneYear | Self::TwoYears => "month",
            Self::FiveYears | Self::TenYears => "year",
        }
    }

    pub fn multiplier(&self) -> u32 {
        1
    }

    pub fn next(&self) -> Self {
        let index = Self::ALL.iter().position(|r| r == self).unwrap_or(0);
        Self::ALL[(index + 1) % Self::ALL.len()]
    }

    pub fn prev(&self) -> Self {
        let index = Self::ALL.iter().position(|r| r == self).unwrap_or(0);
        Self::ALL[(index + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agg_bar_parses_short_fields() {
        let json = r#"{"o":100.0,"h":105.5,"l":99.1,"c":104.0,"v":1200000,"t":1714003200000}"#;
        let bar: AggBar = serde_json::from_str(json).expect("parse bar");
        assert_eq!(bar.c, 104.0);
        assert!((bar.change() - 0.04).abs() < 1e-9);
    }

    #[test]
    fn test_change_handles_zero_open() {
        let bar = AggBar { o: 0.0, h: 0.0, l: 0.0, c: 5.0, v: 0.0, t: 0 };
        assert_eq!(bar.change(), 0.0);
    }

    #[test]
    fn test_market_status_open() {
        let status: MarketStatus =
            serde_json::from_str(r#"{"market":"open","serverTime":"x"}"#).expect("parse status");
        assert!(status.is_open());
        let status: MarketStatus =
            serde_json::from_str(r#"{"market":"extended-hours"}"#).expect("parse status");
        assert!(!status.is_open());
    }

    #[test]
    fn test_range_granularity_coarsens() {
        assert_eq!(HistoryRange::FiveDays.timespan(), "day");
        assert_eq!(HistoryRange::SixMonths.timespan(), "week");
        assert_eq!(HistoryRange::TwoYears.timespan(), "month");
        assert_eq!(HistoryRange::TenYears.timespan(), "year");
    }

    #[test]
    fn test_range_cycle_wraps() {
        assert_eq!(HistoryRange::TenYears.next(), HistoryRange::FiveDays);
        assert_eq!(HistoryRange::FiveDays.prev(), HistoryRange::TenYears);
    }
}
