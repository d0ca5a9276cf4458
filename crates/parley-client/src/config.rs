//! Client configuration loaded from environment variables.
//!
//! Everything has a default, so a client starts with zero configuration.

use std::path::PathBuf;
use std::time::Duration;

use parley_store::{Database, StoreError};

const DEFAULT_REPLY_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_REPLY_MODEL: &str = "gemini-2.5-flash";
const DEFAULT_REPLY_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Database file.
    /// Env: `PARLEY_DB_PATH`
    /// Default: platform data directory (`parley.db`).
    pub db_path: Option<PathBuf>,

    /// Automated reply service.  `None` when no API key is configured.
    pub reply: Option<ReplyConfig>,
}

#[derive(Clone)]
pub struct ReplyConfig {
    /// Env: `PARLEY_REPLY_ENDPOINT`
    pub endpoint: String,
    /// Env: `PARLEY_REPLY_API_KEY` (required to enable replies)
    pub api_key: String,
    /// Env: `PARLEY_REPLY_MODEL`
    pub model: String,
    /// Env: `PARLEY_REPLY_TIMEOUT_SECS`
    pub timeout: Duration,
}

// Keeps the API key out of logs.
impl std::fmt::Debug for ReplyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyConfig")
            .field("endpoint", &self.endpoint)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(path) = lookup("PARLEY_DB_PATH").filter(|p| !p.is_empty()) {
            config.db_path = Some(PathBuf::from(path));
        }

        if let Some(api_key) = lookup("PARLEY_REPLY_API_KEY").filter(|k| !k.is_empty()) {
            let timeout_secs = match lookup("PARLEY_REPLY_TIMEOUT_SECS") {
                Some(val) => val.parse::<u64>().unwrap_or_else(|_| {
                    tracing::warn!(value = %val, "Invalid PARLEY_REPLY_TIMEOUT_SECS, using default");
                    DEFAULT_REPLY_TIMEOUT_SECS
                }),
                None => DEFAULT_REPLY_TIMEOUT_SECS,
            };

            config.reply = Some(ReplyConfig {
                endpoint: lookup("PARLEY_REPLY_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_REPLY_ENDPOINT.to_string()),
                api_key,
                model: lookup("PARLEY_REPLY_MODEL")
                    .unwrap_or_else(|| DEFAULT_REPLY_MODEL.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            });
        }

        config
    }

    /// Open the configured database.
    pub fn open_database(&self) -> Result<Database, StoreError> {
        match &self.db_path {
            Some(path) => Database::open_at(path),
            None => Database::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::from_lookup(|_| None);
        assert!(config.db_path.is_none());
        assert!(config.reply.is_none());
    }

    #[test]
    fn test_db_path_override() {
        let config = ClientConfig::from_lookup(lookup_from(&[("PARLEY_DB_PATH", "/tmp/p.db")]));
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/p.db")));
    }

    #[test]
    fn test_reply_needs_api_key() {
        let config = ClientConfig::from_lookup(lookup_from(&[("PARLEY_REPLY_MODEL", "m")]));
        assert!(config.reply.is_none());

        let config = ClientConfig::from_lookup(lookup_from(&[
            ("PARLEY_REPLY_API_KEY", "secret"),
            ("PARLEY_REPLY_TIMEOUT_SECS", "nope"),
        ]));
        let reply = config.reply.unwrap();
        assert_eq!(reply.model, DEFAULT_REPLY_MODEL);
        assert_eq!(reply.endpoint, DEFAULT_REPLY_ENDPOINT);
        assert_eq!(reply.timeout, Duration::from_secs(DEFAULT_REPLY_TIMEOUT_SECS));
        assert!(!format!("{reply:?}").contains("secret"));
    }

    #[test]
    fn test_open_configured_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            db_path: Some(dir.path().join("client.db")),
            reply: None,
        };
        let db = config.open_database().unwrap();
        assert!(db.path().is_some());
    }
}
