//! Runtime configuration — bind address, database location, token policy.
//!
//! Everything is read once from the environment at startup and carried
//! in an `AppConfig` injected through `ApiContext`; no ambient globals.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "Carelog";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default page size for paginated list endpoints.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Default token lifetime: 1 day (mirrored by the cookie Max-Age).
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 86_400;

/// Default listen address.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

/// Get the application data directory (`~/.carelog/`).
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join(".carelog")
}

/// Default database path (`~/.carelog/carelog.db`).
pub fn default_db_path() -> PathBuf {
    app_data_dir().join("carelog.db")
}

/// Startup configuration, resolved from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to (`CARELOG_ADDR`).
    pub bind_addr: SocketAddr,
    /// SQLite database path (`CARELOG_DB`).
    pub db_path: PathBuf,
    /// HMAC secret for signing auth tokens (`CARELOG_TOKEN_SECRET`).
    pub token_secret: String,
    /// Token lifetime in seconds (`CARELOG_TOKEN_TTL_SECS`).
    pub token_ttl_secs: i64,
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults. A missing token secret gets a random ephemeral one —
    /// tokens then do not survive a restart, so a warning is logged.
    pub fn from_env() -> Self {
        let bind_addr = std::env::var("CARELOG_ADDR")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| DEFAULT_BIND_ADDR.parse().expect("default addr parses"));

        let db_path = std::env::var("CARELOG_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| default_db_path());

        let token_secret = match std::env::var("CARELOG_TOKEN_SECRET") {
            Ok(s) if !s.is_empty() => s,
            _ => {
                tracing::warn!(
                    "CARELOG_TOKEN_SECRET not set — using a random ephemeral secret; \
                     issued tokens will not survive a restart"
                );
                generate_secret()
            }
        };

        let token_ttl_secs = std::env::var("CARELOG_TOKEN_TTL_SECS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(DEFAULT_TOKEN_TTL_SECS);

        Self {
            bind_addr,
            db_path,
            token_secret,
            token_ttl_secs,
        }
    }
}

/// Generate a random URL-safe secret (32 bytes of entropy).
pub fn generate_secret() -> String {
    use base64::Engine;
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with(".carelog"));
    }

    #[test]
    fn default_db_path_under_app_data() {
        let db = default_db_path();
        assert!(db.starts_with(app_data_dir()));
    }

    #[test]
    fn generate_secret_is_random() {
        let s1 = generate_secret();
        let s2 = generate_secret();
        assert_ne!(s1, s2);
        assert!(!s1.is_empty());
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }
}
