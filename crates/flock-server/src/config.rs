use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub session_ttl_hours: i64,
    pub secure_cookies: bool,
}

impl Config {
    /// Reads `FLOCK_*` variables. Unset ones take their defaults; set but
    /// unparseable ones are an error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let session_ttl_hours: i64 = parse_or(&lookup, "FLOCK_SESSION_TTL_HOURS", 24)?;
        if session_ttl_hours <= 0 {
            anyhow::bail!("FLOCK_SESSION_TTL_HOURS must be positive, got {}", session_ttl_hours);
        }

        Ok(Self {
            db_path: PathBuf::from(lookup("FLOCK_DB_PATH").unwrap_or_else(|| "flock.db".into())),
            host: lookup("FLOCK_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port: parse_or(&lookup, "FLOCK_PORT", 5000)?,
            session_ttl_hours,
            secure_cookies: parse_or(&lookup, "FLOCK_SECURE_COOKIES", true)?,
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("invalid {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Result<Config> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = config(&[]).unwrap();
        assert_eq!(cfg.db_path, PathBuf::from("flock.db"));
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 5000);
        assert_eq!(cfg.session_ttl_hours, 24);
        assert!(cfg.secure_cookies);
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = config(&[
            ("FLOCK_PORT", "8080"),
            ("FLOCK_SESSION_TTL_HOURS", "2"),
            ("FLOCK_SECURE_COOKIES", "false"),
        ])
        .unwrap();
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.session_ttl_hours, 2);
        assert!(!cfg.secure_cookies);
    }

    #[test]
    fn bad_numbers_fail() {
        assert!(config(&[("FLOCK_PORT", "eighty")]).is_err());
        assert!(config(&[("FLOCK_SESSION_TTL_HOURS", "0")]).is_err());
    }
}
