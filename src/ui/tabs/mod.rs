pub mod performance;
pub mod search;
pub mod watchlist;
