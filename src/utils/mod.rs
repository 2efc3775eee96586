mod format;

pub use format::{format_market_cap, format_money, format_quantity, format_signed_money};
