use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use chrono::Duration;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me",
    "dev-secret-change-me",
    "super-secret-change-in-production",
];

#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub cors_origins: Vec<String>,
    pub admin_username: String,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("WARDEN_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("WARDEN_JWT_SECRET is unset or still a placeholder");
        }

        let access_hours: i64 = parse_or(var("WARDEN_ACCESS_TTL_HOURS"), 24, "WARDEN_ACCESS_TTL_HOURS")?;
        let refresh_days: i64 = parse_or(var("WARDEN_REFRESH_TTL_DAYS"), 30, "WARDEN_REFRESH_TTL_DAYS")?;
        if access_hours <= 0 || refresh_days <= 0 {
            bail!("token lifetimes must be positive");
        }

        let port: u16 = parse_or(var("WARDEN_PORT"), 5501, "WARDEN_PORT")?;

        let cors_origins = var("WARDEN_CORS_ORIGINS")
            .unwrap_or_else(|| "http://127.0.0.1:5500".into())
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            jwt_secret,
            access_ttl: Duration::hours(access_hours),
            refresh_ttl: Duration::days(refresh_days),
            host: var("WARDEN_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            db_path: var("WARDEN_DB_PATH").unwrap_or_else(|| "warden.db".into()).into(),
            cors_origins,
            admin_username: var("WARDEN_ADMIN_USERNAME").unwrap_or_else(|| "admin".into()),
            admin_password: var("WARDEN_ADMIN_PASSWORD"),
        })
    }
}

fn parse_or<T>(raw: Option<String>, default: T, key: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid {}: '{}'", key, value)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let cfg = config(&[("WARDEN_JWT_SECRET", "a-real-secret")]).unwrap();
        assert_eq!(cfg.access_ttl, Duration::hours(24));
        assert_eq!(cfg.refresh_ttl, Duration::days(30));
        assert_eq!(cfg.host, "0.0.0.0");
        assert_eq!(cfg.port, 5501);
        assert_eq!(cfg.db_path, PathBuf::from("warden.db"));
        assert_eq!(cfg.cors_origins, vec!["http://127.0.0.1:5500".to_string()]);
        assert_eq!(cfg.admin_username, "admin");
        assert!(cfg.admin_password.is_none());
    }

    #[test]
    fn test_overrides() {
        let cfg = config(&[
            ("WARDEN_JWT_SECRET", "a-real-secret"),
            ("WARDEN_ACCESS_TTL_HOURS", "2"),
            ("WARDEN_REFRESH_TTL_DAYS", "7"),
            ("WARDEN_PORT", "8080"),
            ("WARDEN_CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("WARDEN_ADMIN_PASSWORD", "bootstrap"),
        ])
        .unwrap();
        assert_eq!(cfg.access_ttl, Duration::hours(2));
        assert_eq!(cfg.refresh_ttl, Duration::days(7));
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.cors_origins, vec!["https://a.example", "https://b.example"]);
        assert_eq!(cfg.admin_password.as_deref(), Some("bootstrap"));
    }

    #[test]
    fn test_rejects_missing_or_placeholder_secret() {
        assert!(config(&[]).is_err());
        assert!(config(&[("WARDEN_JWT_SECRET", "dev-secret-change-me")]).is_err());
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(config(&[("WARDEN_JWT_SECRET", "s3cret"), ("WARDEN_PORT", "http")]).is_err());
        assert!(config(&[("WARDEN_JWT_SECRET", "s3cret"), ("WARDEN_ACCESS_TTL_HOURS", "0")]).is_err());
    }
}
