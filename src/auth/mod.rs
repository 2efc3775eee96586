//! Credential storage for the login form.
//!
//! Session state itself lives in `crate::session`; this module only covers
//! the optional OS-keychain password remember.

pub mod credentials;

pub use credentials::CredentialStore;
