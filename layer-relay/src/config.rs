//! Configuration surface.
//!
//! Loaded once at startup from a TOML file. Malformed input — a missing
//! `port`/`users` table, a secret that isn't exactly 16 bytes of hex, or the
//! unsupported `middle_proxy = true` — is a fatal [`RelayError::Configuration`]
//! that aborts the process before any listener opens.

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::errors::RelayError;

/// Port Telegram serves its obfuscated2 transport on, for every datacenter.
pub const TG_DATACENTER_PORT: u16 = 443;

/// IPv4 datacenter addresses, indexed by datacenter index.
pub const TG_DATACENTERS_V4: [&str; 5] = [
    "149.154.175.50",
    "149.154.167.51",
    "149.154.175.100",
    "149.154.167.91",
    "149.154.171.5",
];

/// IPv6 datacenter addresses, indexed by datacenter index.
pub const TG_DATACENTERS_V6: [&str; 5] = [
    "2001:b28:f23d:f001::a",
    "2001:67c:04e8:f002::a",
    "2001:b28:f23d:f003::a",
    "2001:67c:04e8:f004::a",
    "2001:b28:f23f:f005::a",
];

const DEFAULT_STATS_PRINT_PERIOD_SECS: u64 = 600;
const DEFAULT_READ_BUF_SIZE: usize = 4096;

#[derive(Deserialize)]
struct RawUser {
    name: String,
    secret: String,
}

#[derive(Deserialize)]
struct RawConfig {
    port: u16,
    users: Vec<RawUser>,
    prefer_ipv6: Option<bool>,
    fast_mode: Option<bool>,
    stats_print_period_secs: Option<u64>,
    read_buf_size: Option<usize>,
    middle_proxy: Option<bool>,
}

/// One configured user: a name and a 16-byte shared secret.
#[derive(Clone)]
pub struct UserEntry {
    pub name: String,
    pub secret: [u8; 16],
}

/// Fully validated relay configuration.
pub struct Config {
    pub port: u16,
    /// Users in the order they appear in the config file — the client
    /// handshake tries them in this order and the first match wins.
    pub users: Vec<UserEntry>,
    pub prefer_ipv6: bool,
    pub fast_mode: bool,
    pub stats_print_period_secs: u64,
    pub read_buf_size: usize,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("users", &self.users.iter().map(|u| u.name.as_str()).collect::<Vec<_>>())
            .field("prefer_ipv6", &self.prefer_ipv6)
            .field("fast_mode", &self.fast_mode)
            .field("stats_print_period_secs", &self.stats_print_period_secs)
            .field("read_buf_size", &self.read_buf_size)
            .finish()
    }
}

impl Config {
    /// Read and parse `path`, then validate it into a ready-to-run [`Config`].
    pub fn load(path: &Path) -> Result<Self, RelayError> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Configuration(format!("reading {}: {e}", path.display()))
        })?;
        let raw: RawConfig = toml::from_str(&text)
            .map_err(|e| RelayError::Configuration(format!("parsing {}: {e}", path.display())))?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawConfig) -> Result<Self, RelayError> {
        if raw.middle_proxy.unwrap_or(false) {
            return Err(RelayError::Configuration(
                "middle_proxy is not implemented by this relay".into(),
            ));
        }
        if raw.users.is_empty() {
            return Err(RelayError::Configuration("users table must not be empty".into()));
        }

        let mut users = Vec::with_capacity(raw.users.len());
        for u in raw.users {
            let bytes = hex::decode(&u.secret).map_err(|e| {
                RelayError::Configuration(format!("user {}: secret is not valid hex: {e}", u.name))
            })?;
            let secret: [u8; 16] = bytes.try_into().map_err(|bytes: Vec<u8>| {
                RelayError::Configuration(format!(
                    "user {}: secret must be 16 bytes (32 hex chars), got {}",
                    u.name,
                    bytes.len()
                ))
            })?;
            users.push(UserEntry { name: u.name, secret });
        }

        Ok(Config {
            port: raw.port,
            users,
            prefer_ipv6: raw.prefer_ipv6.unwrap_or(false),
            fast_mode: raw.fast_mode.unwrap_or(true),
            stats_print_period_secs: raw
                .stats_print_period_secs
                .unwrap_or(DEFAULT_STATS_PRINT_PERIOD_SECS),
            read_buf_size: raw.read_buf_size.unwrap_or(DEFAULT_READ_BUF_SIZE),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_secret_length() {
        let raw = RawConfig {
            port: 443,
            users: vec![RawUser { name: "u1".into(), secret: "aabb".into() }],
            prefer_ipv6: None,
            fast_mode: None,
            stats_print_period_secs: None,
            read_buf_size: None,
            middle_proxy: None,
        };
        assert!(matches!(Config::from_raw(raw), Err(RelayError::Configuration(_))));
    }

    #[test]
    fn rejects_middle_proxy() {
        let raw = RawConfig {
            port: 443,
            users: vec![RawUser { name: "u1".into(), secret: "00".repeat(16) }],
            prefer_ipv6: None,
            fast_mode: None,
            stats_print_period_secs: None,
            read_buf_size: None,
            middle_proxy: Some(true),
        };
        assert!(matches!(Config::from_raw(raw), Err(RelayError::Configuration(_))));
    }

    #[test]
    fn applies_defaults() {
        let raw = RawConfig {
            port: 443,
            users: vec![RawUser { name: "u1".into(), secret: "00".repeat(16) }],
            prefer_ipv6: None,
            fast_mode: None,
            stats_print_period_secs: None,
            read_buf_size: None,
            middle_proxy: None,
        };
        let cfg = Config::from_raw(raw).unwrap();
        assert!(cfg.fast_mode);
        assert!(!cfg.prefer_ipv6);
        assert_eq!(cfg.stats_print_period_secs, DEFAULT_STATS_PRINT_PERIOD_SECS);
        assert_eq!(cfg.read_buf_size, DEFAULT_READ_BUF_SIZE);
    }
}
