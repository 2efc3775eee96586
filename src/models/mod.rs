//! Data structures shared between the API clients and the UI.

mod market;
mod watchlist;

pub use market::{
    AggBar, HistoryRange, MarketStatus, NewsArticle, PrevClose, TickerDetails, TickerMatch,
};
pub use watchlist::{
    sort_watchlist, NewWatchlistItem, WatchlistItem, WatchlistResponse, WatchlistSort,
    WatchlistUpdate,
};
