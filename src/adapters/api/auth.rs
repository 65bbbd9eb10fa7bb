//! Venue Authentication — HMAC-SHA256 Request Signing
//!
//! Signs every private REST request per the Binance spot API: the
//! full query string is MACed with the API secret and appended as a
//! hex `signature` parameter. Credentials come from environment
//! variables (LADDER_API_KEY, LADDER_API_SECRET), optionally seeded
//! from a `.env` file at startup.

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "LADDER_API_KEY";

/// Environment variable holding the API secret.
pub const API_SECRET_ENV: &str = "LADDER_API_SECRET";

/// Load a `.env` file into the process environment.
///
/// `None` searches the working directory and its parents. Variables that
/// are already set are left alone. Returns `Ok(false)` when no file exists.
pub fn load_env_file(path: Option<&Path>) -> Result<bool> {
    let loaded = match path {
        Some(path) => dotenvy::from_path(path),
        None => dotenvy::dotenv().map(|_| ()),
    };
    match loaded {
        Ok(()) => Ok(true),
        Err(dotenvy::Error::Io(ref io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
            Ok(false)
        }
        Err(e) => Err(e).context("Failed to load .env file"),
    }
}

/// API credentials for signed requests.
///
/// The secret never leaves this struct; only signatures do.
pub struct ApiCredentials {
    /// Sent as the `X-MBX-APIKEY` header.
    api_key: String,
    /// HMAC key (never sent).
    api_secret: String,
}

impl ApiCredentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Load credentials from environment variables.
    ///
    /// These MUST come from the process environment or `.env` (never config.toml).
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(API_KEY_ENV).with_context(|| format!("{API_KEY_ENV} not set"))?;
        let api_secret =
            std::env::var(API_SECRET_ENV).with_context(|| format!("{API_SECRET_ENV} not set"))?;
        anyhow::ensure!(!api_key.is_empty(), "{API_KEY_ENV} is empty");
        anyhow::ensure!(!api_secret.is_empty(), "{API_SECRET_ENV} is empty");
        Ok(Self::new(api_key, api_secret))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// Hex HMAC-SHA256 of `query` keyed with the API secret.
    pub fn sign(&self, query: &str) -> String {
        let mac = hmac_sha256::HMAC::mac(query.as_bytes(), self.api_secret.as_bytes());
        hex::encode(mac)
    }

    /// Current Unix time in milliseconds (the `timestamp` parameter).
    pub fn timestamp_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature_matches_published_example() {
        // Example from the Binance spot API documentation (SIGNED endpoints).
        let creds = ApiCredentials::new(
            "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A",
            "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j",
        );
        let query = "symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559";
        assert_eq!(
            creds.sign(query),
            "c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71"
        );
    }

    fn temp_env_file(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("ladder-bot-{}-{name}.env", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_env_file_feeds_credentials() {
        let path = temp_env_file(
            "creds",
            "LADDER_API_KEY=dotenv-key\nLADDER_API_SECRET=dotenv-secret\nLADDER_DOTENV_MARKER=1\n",
        );
        let loaded = load_env_file(Some(&path));
        std::fs::remove_file(&path).ok();

        assert!(loaded.unwrap());
        assert_eq!(std::env::var("LADDER_DOTENV_MARKER").unwrap(), "1");
        let creds = ApiCredentials::from_env().unwrap();
        assert!(!creds.api_key().is_empty());
    }

    #[test]
    fn test_missing_env_file_is_not_an_error() {
        let path = std::env::temp_dir().join("ladder-bot-no-such-file.env");
        assert!(!load_env_file(Some(&path)).unwrap());
    }

    #[test]
    fn test_malformed_env_file_is_an_error() {
        let path = temp_env_file("malformed", "not a valid line\n");
        let loaded = load_env_file(Some(&path));
        std::fs::remove_file(&path).ok();

        assert!(loaded.is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let creds = ApiCredentials::new("key", "super-secret");
        let dbg = format!("{creds:?}");
        assert!(dbg.contains("key"));
        assert!(!dbg.contains("super-secret"));
    }
}
