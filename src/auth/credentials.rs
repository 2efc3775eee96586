use anyhow::{Context, Result};
use keyring::Entry;

const SERVICE_NAME: &str = "stockdeck";

/// Optional "remember me" storage for the login form, backed by the OS
/// keychain. Only the password is kept here; the last-used email lives in
/// the config file.
pub struct CredentialStore;

impl CredentialStore {
    /// Keychain entry scoped to one account's email.
    fn entry(email: &str) -> Result<Entry> {
        Entry::new(SERVICE_NAME, email).context("Failed to create keyring entry")
    }

    /// Store the password for an email in the OS keychain
    pub fn store(email: &str, password: &str) -> Result<()> {
        Self::entry(email)?
            .set_password(password)
            .context("Failed to store password in keychain")
    }

    /// Retrieve the password for an email from the OS keychain
    pub fn get_password(email: &str) -> Result<String> {
        Self::entry(email)?
            .get_password()
            .context("Failed to retrieve password from keychain")
    }

    /// Delete stored credentials for an email
    pub fn delete(email: &str) -> Result<()> {
        Self::entry(email)?
            .delete_credential()
            .context("Failed to delete credential from keychain")
    }

    /// Check if credentials exist for an email
    pub fn has_credentials(email: &str) -> bool {
        Self::entry(email)
            .map(|entry| entry.get_password().is_ok())
            .unwrap_or(false)
    }
}
