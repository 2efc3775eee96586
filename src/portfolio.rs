//! Portfolio arithmetic over the watchlist and a set of latest prices.
//!
//! Pure functions: the app feeds in the watchlist and the prices it has
//! fetched, and the performance tab renders the results. A symbol without a
//! known latest price contributes zero current value, matching how the
//! dashboard degrades when a quote fetch fails.

use std::collections::HashMap;

use crate::models::WatchlistItem;

/// Per-position performance, derived from purchase data and the latest price.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceRow {
    pub id: i64,
    pub stock_symbol: String,
    pub quantity: f64,
    pub purchase_price: f64,
    pub latest_price: f64,
    pub profit_loss: f64,
}

/// Portfolio-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PortfolioTotals {
    /// Sum of purchase price times quantity across all positions.
    pub invested: f64,
    /// Sum of latest price times quantity across all positions.
    pub current_value: f64,
    /// Sum of the positive per-position profit/loss values.
    pub gained: f64,
    /// Absolute sum of the negative per-position profit/loss values.
    pub lost: f64,
}

impl PortfolioTotals {
    pub fn net(&self) -> f64 {
        self.gained - self.lost
    }
}

/// Column the performance table is sorted by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PerformanceSort {
    #[default]
    Symbol,
    Quantity,
    ProfitLoss,
}

impl PerformanceSort {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Symbol => "Symbol",
            Self::Quantity => "Quantity",
            Self::ProfitLoss => "Profit/Loss",
        }
    }

    pub fn next(&self) -> Self {
        match self {
            Self::Symbol => Self::Quantity,
            Self::Quantity => Self::ProfitLoss,
            Self::ProfitLoss => Self::Symbol,
        }
    }
}

/// Build one performance row per position. Unknown symbols get a latest
/// price of zero.
pub fn performance_rows(
    watchlist: &[WatchlistItem],
    latest_prices: &HashMap<String, f64>,
) -> Vec<PerformanceRow> {
    watchlist
        .iter()
        .map(|item| {
            let latest_price = latest_prices
                .get(&item.stock_symbol)
                .copied()
                .unwrap_or(0.0);
            PerformanceRow {
                id: item.id,
                stock_symbol: item.stock_symbol.clone(),
                quantity: item.quantity,
                purchase_price: item.price_at_time,
                latest_price,
                profit_loss: (latest_price - item.price_at_time) * item.quantity,
            }
        })
        .collect()
}

pub fn sort_rows(rows: &mut [PerformanceRow], sort: PerformanceSort, ascending: bool) {
    rows.sort_by(|a, b| {
        let ordering = match sort {
            PerformanceSort::Symbol => a.stock_symbol.cmp(&b.stock_symbol),
            PerformanceSort::Quantity => a
                .quantity
                .partial_cmp(&b.quantity)
                .unwrap_or(std::cmp::Ordering::Equal),
            PerformanceSort::ProfitLoss => a
                .profit_loss
                .partial_cmp(&b.profit_loss)
                .unwrap_or(std::cmp::Ordering::Equal),
        };
        if ascending {
            ordering
        } else {
            ordering.reverse()
        }
    });
}

/// Totals across the whole portfolio. Gains and losses are accumulated
/// separately so the dashboard can show both alongside the net figure.
pub fn totals(rows: &[PerformanceRow]) -> PortfolioTotals {
    let mut totals = PortfolioTotals::default();
    for row in rows {
        totals.invested += row.purchase_price * row.quantity;
        totals.current_value += row.latest_price * row.quantity;
        if row.profit_loss >= 0.0 {
            totals.gained += row.profit_loss;
        } else {
            totals.lost += -row.profit_loss;
        }
    }
    totals
}

/// Invested value aggregated per symbol, in first-seen order. Drives the
/// distribution bars on the performance tab.
pub fn distribution(watchlist: &[WatchlistItem]) -> Vec<(String, f64)> {
    let mut order: Vec<String> = Vec::new();
    let mut invested: HashMap<String, f64> = HashMap::new();
    for item in watchlist {
        if !invested.contains_key(&item.stock_symbol) {
            order.push(item.stock_symbol.clone());
        }
        *invested.entry(item.stock_symbol.clone()).or_insert(0.0) += item.invested();
    }
    order
        .into_iter()
        .map(|symbol| {
            let value = invested.get(&symbol).copied().unwrap_or(0.0);
            (symbol, value)
        })
        .collect()
}

/// Distinct symbols in first-seen order, for batching price lookups.
pub fn unique_symbols(watchlist: &[WatchlistItem]) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for item in watchlist {
        if !symbols.contains(&item.stock_symbol) {
            symbols.push(item.stock_symbol.clone());
        }
    }
    symbols
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(id: i64, symbol: &str, quantity: f64, price: f64) -> WatchlistItem {
        WatchlistItem {
            id,
            stock_symbol: symbol.to_string(),
            quantity,
            price_at_time: price,
            added_at: None,
            industry: None,
            manual: false,
        }
    }

    fn prices(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(s, p)| (s.to_string(), *p)).collect()
    }

    #[test]
    fn test_rows_compute_profit_loss() {
        let watchlist = vec![item(1, "AAPL", 2.0, 100.0), item(2, "MSFT", 1.0, 400.0)];
        let rows = performance_rows(&watchlist, &prices(&[("AAPL", 110.0), ("MSFT", 380.0)]));
        assert_eq!(rows[0].profit_loss, 20.0);
        assert_eq!(rows[1].profit_loss, -20.0);
    }

    #[test]
    fn test_unknown_symbol_counts_as_zero_price() {
        let watchlist = vec![item(1, "AAPL", 2.0, 100.0)];
        let rows = performance_rows(&watchlist, &HashMap::new());
        assert_eq!(rows[0].latest_price, 0.0);
        assert_eq!(rows[0].profit_loss, -200.0);
    }

    #[test]
    fn test_totals_split_gains_and_losses() {
        let watchlist = vec![
            item(1, "AAPL", 2.0, 100.0),
            item(2, "MSFT", 1.0, 400.0),
            item(3, "GOOG", 3.0, 150.0),
        ];
        let rows = performance_rows(
            &watchlist,
            &prices(&[("AAPL", 110.0), ("MSFT", 380.0), ("GOOG", 160.0)]),
        );
        let totals = totals(&rows);
        assert_eq!(totals.invested, 200.0 + 400.0 + 450.0);
        assert_eq!(totals.current_value, 220.0 + 380.0 + 480.0);
        assert_eq!(totals.gained, 20.0 + 30.0);
        assert_eq!(totals.lost, 20.0);
        assert_eq!(totals.net(), 30.0);
    }

    #[test]
    fn test_distribution_aggregates_and_preserves_order() {
        let watchlist = vec![
            item(1, "MSFT", 1.0, 400.0),
            item(2, "AAPL", 2.0, 100.0),
            item(3, "MSFT", 1.0, 410.0),
        ];
        let distribution = distribution(&watchlist);
        assert_eq!(
            distribution,
            vec![("MSFT".to_string(), 810.0), ("AAPL".to_string(), 200.0)]
        );
    }

    #[test]
    fn test_unique_symbols_first_seen_order() {
        let watchlist = vec![
            item(1, "MSFT", 1.0, 400.0),
            item(2, "AAPL", 2.0, 100.0),
            item(3, "MSFT", 1.0, 410.0),
        ];
        assert_eq!(unique_symbols(&watchlist), ["MSFT", "AAPL"]);
    }

    #[test]
    fn test_sort_rows_by_profit_loss_descending() {
        let watchlist = vec![item(1, "AAPL", 2.0, 100.0), item(2, "MSFT", 1.0, 400.0)];
        let mut rows = performance_rows(&watchlist, &prices(&[("AAPL", 110.0), ("MSFT", 380.0)]));
        sort_rows(&mut rows, PerformanceSort::ProfitLoss, false);
        assert_eq!(rows[0].stock_symbol, "AAPL");
    }
}
