//! Client for the Polygon-style market data API.
//!
//! Search, reference data, aggregate bars, news, and market status all live
//! on a separate host from the backend and authenticate with an API key
//! query parameter instead of the session's bearer token, so this gets its
//! own client rather than running through the 403 interceptor.

use std::time::Duration;

use chrono::{Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::models::{
    AggBar, HistoryRange, MarketStatus, NewsArticle, PrevClose, TickerDetails, TickerMatch,
};

use super::ApiError;

const DEFAULT_MARKET_API_URL: &str = "https://api.polygon.io";
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Generic envelope for endpoints that wrap their payload in `results`.
#[derive(Debug, serde::Deserialize)]
struct ResultsEnvelope<T> {
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, serde::Deserialize)]
struct SingleEnvelope<T> {
    results: T,
}

#[derive(Clone)]
pub struct MarketClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl MarketClient {
    pub fn new(api_key: impl Into<String>) -> Result<Self, ApiError> {
        Self::with_base_url(DEFAULT_MARKET_API_URL, api_key)
    }

    pub fn with_base_url(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "Market API request");
        let response = self
            .client
            .get(&url)
            .query(query)
            .query(&[("apiKey", self.api_key.as_str())])
            .send()
            .await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::from_status(status, &body));
        }
        response.json().await.map_err(|e| {
            ApiError::InvalidResponse(format!("Failed to parse response from {}: {}", path, e))
        })
    }

    /// Search tickers by symbol or company name. Active US stocks only.
    pub async fn search_tickers(&self, query: &str) -> Result<Vec<TickerMatch>, ApiError> {
        let envelope: ResultsEnvelope<TickerMatch> = self
            .get_json(
                "/v3/reference/tickers",
                &[
                    ("search", query),
                    ("market", "stocks"),
                    ("active", "true"),
                    ("limit", "10"),
                ],
            )
            .await?;
        Ok(envelope.results)
    }

    /// Reference details for one ticker (name, market cap, description).
    pub async fn ticker_details(&self, symbol: &str) -> Result<TickerDetails, ApiError> {
        let envelope: SingleEnvelope<TickerDetails> = self
            .get_json(&format!("/v3/reference/tickers/{}", symbol), &[])
            .await?;
        Ok(envelope.results)
    }

    /// Previous trading day's OHLCV bar for a ticker.
    pub async fn previous_close(&self, symbol: &str) -> Result<Option<PrevClose>, ApiError> {
        let envelope: ResultsEnvelope<PrevClose> = self
            .get_json(&format!("/v2/aggs/ticker/{}/prev", symbol), &[])
            .await?;
        Ok(envelope.results.into_iter().next())
    }

    /// Aggregate bars covering the given history range, ending today.
    pub async fn aggregates(
        &self,
        symbol: &str,
        range: HistoryRange,
    ) -> Result<Vec<AggBar>, ApiError> {
        let to = Utc::now().date_naive();
        let from = to - ChronoDuration::days(range.lookback_days());
        let path = format!(
            "/v2/aggs/ticker/{}/range/{}/{}/{}/{}",
            symbol,
            range.multiplier(),
            range.timespan(),
            from.format("%Y-%m-%d"),
            to.format("%Y-%m-%d"),
        );
        let envelope: ResultsEnvelope<AggBar> = self
            .get_json(&path, &[("adjusted", "true"), ("sort", "asc"), ("limit", "5000")])
            .await?;
        Ok(envelope.results)
    }

    /// Recent news articles for a ticker.
    pub async fn news(&self, symbol: &str) -> Result<Vec<NewsArticle>, ApiError> {
        let envelope: ResultsEnvelope<NewsArticle> = self
            .get_json(
                "/v2/reference/news",
                &[("ticker", symbol), ("limit", "5"), ("order", "desc")],
            )
            .await?;
        Ok(envelope.results)
    }

    /// Whether the US exchanges are currently open.
    pub async fn market_status(&self) -> Result<MarketStatus, ApiError> {
        self.get_json("/v1/marketstatus/now", &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_results_envelope_defaults_to_empty() {
        let envelope: ResultsEnvelope<TickerMatch> =
            serde_json::from_str(r#"{"status":"OK"}"#).expect("parse envelope");
        assert!(envelope.results.is_empty());
    }

    #[test]
    fn test_aggregate_path_dates_are_ordered() {
        let to = Utc::now().date_naive();
        let from = to - ChronoDuration::days(HistoryRange::FiveYears.lookback_days());
        assert!(from < to);
    }
}
