use std::fmt;
use std::path::PathBuf;

use anyhow::{Result, bail};

/// Values a copied-but-unedited `.env.example` would supply.
const PLACEHOLDER_SECRETS: &[&str] = &["paste-output-of-openssl-rand-base64-64", "secret"];

/// Runtime configuration, built once at startup and shared read-only.
#[derive(Clone)]
pub struct AppConfig {
    pub jwt_secret: String,
    /// Key the upgrade webhook must present. `None` disables the check.
    pub polka_key: Option<String>,
    pub db_path: PathBuf,
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = var("CHIRPY_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("CHIRPY_JWT_SECRET is unset or still a placeholder");
        }

        let port = match var("CHIRPY_PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|e| anyhow::anyhow!("invalid CHIRPY_PORT '{}': {}", raw, e))?,
            None => 8080,
        };

        Ok(Self {
            jwt_secret,
            polka_key: var("CHIRPY_POLKA_KEY"),
            db_path: var("CHIRPY_DB_PATH")
                .unwrap_or_else(|| "database.json".into())
                .into(),
            host: var("CHIRPY_HOST").unwrap_or_else(|| "0.0.0.0".into()),
            port,
            static_dir: var("CHIRPY_STATIC_DIR").unwrap_or_else(|| ".".into()).into(),
        })
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("jwt_secret", &"<redacted>")
            .field("polka_key", &self.polka_key.as_ref().map(|_| "<redacted>"))
            .field("db_path", &self.db_path)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("static_dir", &self.static_dir)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_secret_is_set() {
        let config = AppConfig::from_lookup(lookup(&[("CHIRPY_JWT_SECRET", "s3cret")])).unwrap();
        assert_eq!(config.jwt_secret, "s3cret");
        assert_eq!(config.polka_key, None);
        assert_eq!(config.db_path, PathBuf::from("database.json"));
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8080);
        assert_eq!(config.static_dir, PathBuf::from("."));
    }

    #[test]
    fn explicit_values_override_defaults() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CHIRPY_JWT_SECRET", "s3cret"),
            ("CHIRPY_POLKA_KEY", "f271c81ff7084ee5b99a5091b42d486e"),
            ("CHIRPY_DB_PATH", "/tmp/chirpy.json"),
            ("CHIRPY_HOST", "127.0.0.1"),
            ("CHIRPY_PORT", "9000"),
            ("CHIRPY_STATIC_DIR", "public"),
        ]))
        .unwrap();
        assert_eq!(config.polka_key.as_deref(), Some("f271c81ff7084ee5b99a5091b42d486e"));
        assert_eq!(config.db_path, PathBuf::from("/tmp/chirpy.json"));
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 9000);
        assert_eq!(config.static_dir, PathBuf::from("public"));
    }

    #[test]
    fn missing_or_placeholder_secret_is_fatal() {
        assert!(AppConfig::from_lookup(lookup(&[])).is_err());
        assert!(AppConfig::from_lookup(lookup(&[("CHIRPY_JWT_SECRET", "  ")])).is_err());
        for placeholder in PLACEHOLDER_SECRETS {
            let pairs = [("CHIRPY_JWT_SECRET", *placeholder)];
            assert!(AppConfig::from_lookup(lookup(&pairs)).is_err());
        }
    }

    #[test]
    fn env_template_secret_is_rejected() {
        let template = include_str!("../../../.env.example");
        let secret = template
            .lines()
            .find_map(|line| line.strip_prefix("CHIRPY_JWT_SECRET="))
            .unwrap();
        assert!(PLACEHOLDER_SECRETS.contains(&secret));
    }

    #[test]
    fn bad_port_is_rejected() {
        let result = AppConfig::from_lookup(lookup(&[
            ("CHIRPY_JWT_SECRET", "s3cret"),
            ("CHIRPY_PORT", "eighty"),
        ]));
        assert!(result.is_err());
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let config = AppConfig::from_lookup(lookup(&[
            ("CHIRPY_JWT_SECRET", "s3cret"),
            ("CHIRPY_POLKA_KEY", "polka-value-123"),
        ]))
        .unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("s3cret"));
        assert!(!debug.contains("polka-value-123"));
    }
}
