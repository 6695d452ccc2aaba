//! Application settings.
//!
//! Values come from an optional TOML file (path in `CUSTODIA_CONFIG`, or
//! `./config.toml` when present) and are then overridden by environment
//! variables. `JWT_SECRET` has no default and must be provided by one of them.

use crate::config::database::DEFAULT_DATABASE_URL;
use crate::errors::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// Upper bound for session and signature-link lifetimes (one year).
pub const MAX_TTL_HOURS: i64 = 24 * 366;

/// Mail delivery settings
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MailSettings {
    /// HTTP endpoint that accepts outgoing mail as JSON. `None` logs mail instead.
    pub webhook_url: Option<String>,
    /// Sender address
    pub from: Option<String>,
}

/// Administrator account created on first start when the users table is empty
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSeed {
    /// Display name
    pub nombre: String,
    /// Login email
    pub email: String,
    /// Initial password
    pub password: String,
}

/// Shape of config.toml. Every key is optional.
#[derive(Debug, Default, Deserialize)]
pub struct FileSettings {
    /// Listen address
    pub bind_addr: Option<String>,
    /// `SeaORM` database URL
    pub database_url: Option<String>,
    /// HMAC secret for session JWTs
    pub jwt_secret: Option<String>,
    /// Session lifetime
    pub jwt_ttl_hours: Option<i64>,
    /// Lifetime of emailed signature links
    pub signature_token_ttl_hours: Option<i64>,
    /// Base URL of the frontend, used to build signature links
    pub public_base_url: Option<String>,
    /// Directory for uploaded signed documents
    pub upload_dir: Option<PathBuf>,
    /// Request body limit for uploads
    pub max_upload_bytes: Option<usize>,
    /// Mail delivery
    #[serde(default)]
    pub mail: MailSettings,
    /// Initial administrator
    pub admin: Option<AdminSeed>,
}

/// Resolved application settings
#[derive(Debug, Clone)]
pub struct Settings {
    /// Listen address
    pub bind_addr: String,
    /// `SeaORM` database URL
    pub database_url: String,
    /// HMAC secret for session JWTs
    pub jwt_secret: String,
    /// Session lifetime in hours
    pub jwt_ttl_hours: i64,
    /// Lifetime of emailed signature links in hours
    pub signature_token_ttl_hours: i64,
    /// Base URL of the frontend
    pub public_base_url: String,
    /// Directory for uploaded signed documents
    pub upload_dir: PathBuf,
    /// Request body limit for uploads
    pub max_upload_bytes: usize,
    /// Sender address for outgoing mail
    pub mail_from: String,
    /// Mail webhook, if any
    pub mail_webhook_url: Option<String>,
    /// Initial administrator, if configured
    pub admin: Option<AdminSeed>,
}

impl Settings {
    /// Merges file values with overrides looked up through `env`.
    ///
    /// `env` is a lookup function so tests can supply variables without
    /// touching the process environment.
    pub fn from_sources<F>(file: FileSettings, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let jwt_secret = env("JWT_SECRET")
            .or(file.jwt_secret)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| Error::Config {
                message: "JWT_SECRET must be set in the environment or config.toml".to_string(),
            })?;

        let admin = match (env("ADMIN_EMAIL"), env("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminSeed {
                nombre: env("ADMIN_NOMBRE").unwrap_or_else(|| "Administrador".to_string()),
                email,
                password,
            }),
            _ => file.admin,
        };

        let settings = Self {
            bind_addr: env("BIND_ADDR")
                .or(file.bind_addr)
                .unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            database_url: env("DATABASE_URL")
                .or(file.database_url)
                .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string()),
            jwt_secret,
            jwt_ttl_hours: parse_env(&env, "JWT_TTL_HOURS")?
                .or(file.jwt_ttl_hours)
                .unwrap_or(8),
            signature_token_ttl_hours: parse_env(&env, "SIGNATURE_TOKEN_TTL_HOURS")?
                .or(file.signature_token_ttl_hours)
                .unwrap_or(72),
            public_base_url: env("PUBLIC_BASE_URL")
                .or(file.public_base_url)
                .unwrap_or_else(|| "http://localhost:4200".to_string())
                .trim_end_matches('/')
                .to_string(),
            upload_dir: env("UPLOAD_DIR")
                .map(PathBuf::from)
                .or(file.upload_dir)
                .unwrap_or_else(|| PathBuf::from("uploads")),
            max_upload_bytes: parse_env(&env, "MAX_UPLOAD_BYTES")?
                .or(file.max_upload_bytes)
                .unwrap_or(10 * 1024 * 1024),
            mail_from: env("MAIL_FROM")
                .or(file.mail.from)
                .unwrap_or_else(|| "inventario@localhost".to_string()),
            mail_webhook_url: env("MAIL_WEBHOOK_URL").or(file.mail.webhook_url),
            admin,
        };

        for (key, hours) in [
            ("JWT_TTL_HOURS", settings.jwt_ttl_hours),
            ("SIGNATURE_TOKEN_TTL_HOURS", settings.signature_token_ttl_hours),
        ] {
            if !(1..=MAX_TTL_HOURS).contains(&hours) {
                return Err(Error::Config {
                    message: format!("{key} must be between 1 and {MAX_TTL_HOURS}, got {hours}"),
                });
            }
        }

        Ok(settings)
    }
}

fn parse_env<F, T>(env: &F, key: &str) -> Result<Option<T>>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    env(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| Error::Config {
                message: format!("Invalid value for {key}: {e}"),
            })
        })
        .transpose()
}

/// Parses a TOML settings file.
pub fn load_file<P: AsRef<Path>>(path: P) -> Result<FileSettings> {
    let path_ref = path.as_ref();
    tracing::debug!("Loading configuration from {:?}", path_ref);
    let contents = std::fs::read_to_string(path_ref).map_err(|e| Error::Config {
        message: format!("Failed to read config file {path_ref:?}: {e}"),
    })?;

    toml::from_str(&contents).map_err(|e| Error::Config {
        message: format!("Failed to parse {path_ref:?}: {e}"),
    })
}

/// Loads settings from the configured file (if any) and the process environment.
pub fn load_settings() -> Result<Settings> {
    let file = match std::env::var("CUSTODIA_CONFIG") {
        Ok(path) => load_file(path)?,
        Err(_) if Path::new(DEFAULT_CONFIG_PATH).exists() => load_file(DEFAULT_CONFIG_PATH)?,
        Err(_) => FileSettings::default(),
    };

    Settings::from_sources(file, |key| std::env::var(key).ok())
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use std::collections::HashMap;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_secret_only() {
        let settings =
            Settings::from_sources(FileSettings::default(), env_from(&[("JWT_SECRET", "s3cret")]))
                .unwrap();

        assert_eq!(settings.bind_addr, "0.0.0.0:3000");
        assert_eq!(settings.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(settings.jwt_ttl_hours, 8);
        assert_eq!(settings.signature_token_ttl_hours, 72);
        assert_eq!(settings.upload_dir, PathBuf::from("uploads"));
        assert!(settings.mail_webhook_url.is_none());
        assert!(settings.admin.is_none());
    }

    #[test]
    fn test_missing_secret_is_config_error() {
        let result = Settings::from_sources(FileSettings::default(), env_from(&[]));
        assert!(matches!(result, Err(Error::Config { .. })));

        let result =
            Settings::from_sources(FileSettings::default(), env_from(&[("JWT_SECRET", "  ")]));
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_env_overrides_file() {
        let file: FileSettings = toml::from_str(
            r#"
            bind_addr = "127.0.0.1:8080"
            jwt_secret = "from-file"
            jwt_ttl_hours = 4
            public_base_url = "https://inventario.example.com/"

            [mail]
            webhook_url = "https://mail.example.com/send"
            from = "no-reply@example.com"

            [admin]
            nombre = "Root"
            email = "root@example.com"
            password = "changeme123"
            "#,
        )
        .unwrap();

        let settings = Settings::from_sources(
            file,
            env_from(&[("JWT_TTL_HOURS", "12"), ("BIND_ADDR", "0.0.0.0:9000")]),
        )
        .unwrap();

        assert_eq!(settings.bind_addr, "0.0.0.0:9000");
        assert_eq!(settings.jwt_secret, "from-file");
        assert_eq!(settings.jwt_ttl_hours, 12);
        assert_eq!(settings.public_base_url, "https://inventario.example.com");
        assert_eq!(
            settings.mail_webhook_url.as_deref(),
            Some("https://mail.example.com/send")
        );
        assert_eq!(settings.mail_from, "no-reply@example.com");
        assert_eq!(settings.admin.unwrap().email, "root@example.com");
    }

    #[test]
    fn test_invalid_number_is_config_error() {
        let result = Settings::from_sources(
            FileSettings::default(),
            env_from(&[("JWT_SECRET", "x"), ("JWT_TTL_HOURS", "ocho")]),
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_non_positive_ttl_rejected() {
        let result = Settings::from_sources(
            FileSettings::default(),
            env_from(&[("JWT_SECRET", "x"), ("SIGNATURE_TOKEN_TTL_HOURS", "0")]),
        );
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_oversized_ttl_rejected() {
        let result = Settings::from_sources(
            FileSettings::default(),
            env_from(&[
                ("JWT_SECRET", "x"),
                ("SIGNATURE_TOKEN_TTL_HOURS", "9000000000000000"),
            ]),
        );
        assert!(matches!(result, Err(Error::Config { .. })));

        let file: FileSettings = toml::from_str("jwt_ttl_hours = 9000000000000000").unwrap();
        let result = Settings::from_sources(file, env_from(&[("JWT_SECRET", "x")]));
        assert!(matches!(result, Err(Error::Config { .. })));

        let max = MAX_TTL_HOURS.to_string();
        let settings = Settings::from_sources(
            FileSettings::default(),
            env_from(&[("JWT_SECRET", "x"), ("JWT_TTL_HOURS", max.as_str())]),
        )
        .unwrap();
        assert_eq!(settings.jwt_ttl_hours, MAX_TTL_HOURS);
    }
}
