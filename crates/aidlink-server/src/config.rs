//! Server configuration loaded from environment variables.

use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the SQLite database file
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    /// Nearby search radius when the caller omits one
    pub default_radius_km: f64,
    /// Append a random tail to issued passwords
    pub harden_credentials: bool,
    /// Notifications buffered for the delivery worker
    pub outbox_capacity: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let config = Config {
            db_path: lookup("AIDLINK_DB_PATH")
                .unwrap_or_else(|| "aidlink.db".into())
                .into(),
            host: lookup("AIDLINK_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse(&lookup, "AIDLINK_PORT", 3000)?,
            default_radius_km: parse(&lookup, "AIDLINK_DEFAULT_RADIUS_KM", 10.0)?,
            harden_credentials: parse(&lookup, "AIDLINK_HARDEN_CREDENTIALS", true)?,
            outbox_capacity: parse(&lookup, "AIDLINK_OUTBOX_CAPACITY", 1024)?,
        };

        if !config.default_radius_km.is_finite() || config.default_radius_km <= 0.0 {
            bail!("AIDLINK_DEFAULT_RADIUS_KM must be a positive number");
        }
        if config.outbox_capacity == 0 {
            bail!("AIDLINK_OUTBOX_CAPACITY must be at least 1");
        }
        Ok(config)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("Invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("aidlink.db"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.default_radius_km, 10.0);
        assert!(config.harden_credentials);
        assert_eq!(config.outbox_capacity, 1024);
    }

    #[test]
    fn overrides() {
        let config = load(&[
            ("AIDLINK_PORT", "8080"),
            ("AIDLINK_DEFAULT_RADIUS_KM", "2.5"),
            ("AIDLINK_HARDEN_CREDENTIALS", "false"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.default_radius_km, 2.5);
        assert!(!config.harden_credentials);
    }

    #[test]
    fn invalid_values_fail_startup() {
        assert!(load(&[("AIDLINK_PORT", "http")]).is_err());
        assert!(load(&[("AIDLINK_HARDEN_CREDENTIALS", "yes")]).is_err());
        assert!(load(&[("AIDLINK_DEFAULT_RADIUS_KM", "-3")]).is_err());
        assert!(load(&[("AIDLINK_OUTBOX_CAPACITY", "0")]).is_err());
    }
}
