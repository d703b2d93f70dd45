//! Credential storage for taskbridge.
//!
//! API keys are kept in the operating system's credential manager:
//!
//! - **macOS**: Keychain Services
//! - **Windows**: Credential Manager
//! - **Linux**: kernel keyutils
//!
//! [`resolve_token`] implements the lookup order used at startup: an
//! explicit value (normally from the environment) wins over the keychain,
//! and a missing credential is a configuration error.
//!
//! # Example
//!
//! ```ignore
//! use taskbridge_storage::{token_key, CredentialStore, KeychainStore};
//!
//! let store = KeychainStore::new();
//! store.store(&token_key("linear"), "lin_api_xxx")?;
//! assert!(store.exists(&token_key("linear")));
//! ```

use std::collections::HashMap;
use std::sync::RwLock;

use keyring::Entry;
use taskbridge_core::{Error, Result};
use tracing::{debug, warn};

/// Service name used in OS keychain.
const SERVICE_NAME: &str = "taskbridge";

/// Credential storage trait.
///
/// Keys follow `{provider}/{credential_name}`, e.g. `linear/token`.
pub trait CredentialStore: Send + Sync {
    /// Store a credential, replacing any previous value.
    fn store(&self, key: &str, value: &str) -> Result<()>;

    /// Retrieve a stored credential, `Ok(None)` if absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Delete a stored credential. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> Result<()>;

    fn exists(&self, key: &str) -> bool {
        matches!(self.get(key), Ok(Some(_)))
    }
}

// =============================================================================
// KeychainStore
// =============================================================================

/// Credential store backed by the OS keychain.
#[derive(Debug)]
pub struct KeychainStore {
    service_name: String,
}

impl KeychainStore {
    pub fn new() -> Self {
        Self {
            service_name: SERVICE_NAME.to_string(),
        }
    }

    /// Keychain store under a different service name, to keep test
    /// entries apart from real ones.
    pub fn with_service_name(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }

    fn entry(&self, key: &str) -> Result<Entry> {
        Entry::new(&self.service_name, key).map_err(|e| {
            Error::Storage(format!(
                "Failed to open keychain entry for '{}': {}",
                key, e
            ))
        })
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeychainStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        debug!(key = key, "Storing credential in keychain");

        self.entry(key)?
            .set_password(value)
            .map_err(|e| Error::Storage(format!("Failed to store credential '{}': {}", key, e)))
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        debug!(key = key, "Reading credential from keychain");

        match self.entry(key)?.get_password() {
            Ok(secret) => Ok(Some(secret)),
            Err(keyring::Error::NoEntry) => {
                debug!(key = key, "Credential not found");
                Ok(None)
            }
            Err(e) => {
                warn!(key = key, error = %e, "Failed to read credential");
                Err(Error::Storage(format!(
                    "Failed to read credential '{}': {}",
                    key, e
                )))
            }
        }
    }

    fn delete(&self, key: &str) -> Result<()> {
        debug!(key = key, "Deleting credential from keychain");

        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(Error::Storage(format!(
                "Failed to delete credential '{}': {}",
                key, e
            ))),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-memory credential store for tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    credentials: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `(key, value)` pairs.
    pub fn with_credentials<K, V>(credentials: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let map = credentials
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            credentials: RwLock::new(map),
        }
    }
}

impl CredentialStore for MemoryStore {
    fn store(&self, key: &str, value: &str) -> Result<()> {
        self.credentials
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self
            .credentials
            .read()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?
            .get(key)
            .cloned())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.credentials
            .write()
            .map_err(|e| Error::Storage(format!("Lock poisoned: {}", e)))?
            .remove(key);
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Standard credential key for a provider's API token.
pub fn token_key(provider: &str) -> String {
    format!("{}/token", provider)
}

/// Where a resolved token came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenSource {
    Environment,
    Keychain,
}

/// Resolve a provider token: `explicit` first, then `store`.
///
/// Blank values count as absent. A token found nowhere is
/// [`Error::Config`] naming `env_var` and the login command.
pub fn resolve_token(
    provider: &str,
    env_var: &str,
    explicit: Option<String>,
    store: &dyn CredentialStore,
) -> Result<(String, TokenSource)> {
    if let Some(token) = explicit.filter(|t| !t.trim().is_empty()) {
        debug!(provider = provider, "Using token from environment");
        return Ok((token.trim().to_string(), TokenSource::Environment));
    }

    let key = token_key(provider);
    match store.get(&key)? {
        Some(token) if !token.trim().is_empty() => {
            debug!(provider = provider, "Using token from keychain");
            Ok((token.trim().to_string(), TokenSource::Keychain))
        }
        _ => Err(Error::Config(format!(
            "No {} API key found. Set {} or run `taskbridge auth login --token <key>`",
            provider, env_var
        ))),
    }
}

/// Mask a secret for display, keeping only its last four characters.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_lifecycle() {
        let store = MemoryStore::new();

        store.store("linear/token", "lin_api_1").unwrap();
        assert_eq!(store.get("linear/token").unwrap().as_deref(), Some("lin_api_1"));
        assert!(store.exists("linear/token"));

        store.store("linear/token", "lin_api_2").unwrap();
        assert_eq!(store.get("linear/token").unwrap().as_deref(), Some("lin_api_2"));

        store.delete("linear/token").unwrap();
        assert!(!store.exists("linear/token"));

        // Missing key deletes cleanly
        store.delete("linear/token").unwrap();
    }

    #[test]
    fn test_token_key() {
        assert_eq!(token_key("linear"), "linear/token");
    }

    #[test]
    fn test_resolve_prefers_explicit_value() {
        let store = MemoryStore::with_credentials([("linear/token", "from-keychain")]);

        let (token, source) =
            resolve_token("linear", "LINEAR_API_KEY", Some("from-env".into()), &store).unwrap();

        assert_eq!(token, "from-env");
        assert_eq!(source, TokenSource::Environment);
    }

    #[test]
    fn test_resolve_falls_back_to_store() {
        let store = MemoryStore::with_credentials([("linear/token", "from-keychain")]);

        let (token, source) =
            resolve_token("linear", "LINEAR_API_KEY", Some("   ".into()), &store).unwrap();

        assert_eq!(token, "from-keychain");
        assert_eq!(source, TokenSource::Keychain);
    }

    #[test]
    fn test_resolve_missing_is_config_error() {
        let store = MemoryStore::new();

        let err = resolve_token("linear", "LINEAR_API_KEY", None, &store).unwrap_err();

        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("LINEAR_API_KEY"));
    }

    #[test]
    fn test_mask_secret() {
        assert_eq!(mask_secret("lin_api_abcdef1234"), "****1234");
        assert_eq!(mask_secret("abc"), "****");
    }

    #[test]
    fn test_keychain_service_names() {
        assert_eq!(KeychainStore::new().service_name, "taskbridge");
        assert_eq!(KeychainStore::default().service_name, "taskbridge");
        assert_eq!(
            KeychainStore::with_service_name("taskbridge-test").service_name,
            "taskbridge-test"
        );
    }
}
