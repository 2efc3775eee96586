//! HTTP clients for the Investment Hub backend and the market data API.

mod client;
mod error;
mod market;

pub use client::{ApiClient, AuthEvent};
pub use error::ApiError;
pub use market::MarketClient;
