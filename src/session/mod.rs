//! Session lifecycle: the in-memory credential store and the expiry notifier.
//!
//! The `SessionStore` is the single source of truth for the current user and
//! their bearer tokens. The `ExpiryNotifier` asks the user to confirm
//! presence after an hour and forces a logout if they don't.

pub mod expiry;
pub mod store;

pub use expiry::{ExpiryAction, ExpiryNotifier};
pub use store::{SessionStore, User};
