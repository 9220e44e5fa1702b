use std::path::{Path, PathBuf};

use anyhow::Context;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};
use thiserror::Error;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "CHATDB_ENV";
const CONFIG_DIR_ENV: &str = "CHATDB_CONFIG_DIR";
const ENV_PREFIX: &str = "CHATDB";

/// Variables the conversation service already reads, mapped onto settings keys.
/// Each applies only when the `CHATDB_` equivalent is unset; an empty value
/// counts as unset.
const LEGACY_ALIASES: &[(&str, &str, &str)] = &[
    ("MONGO_URI", "CHATDB_DATABASE__URI", "database.uri"),
    ("MONGODB_NAME", "CHATDB_DATABASE__APP_DATABASE", "database.app_database"),
    ("MONGODB_COLLECTION", "CHATDB_DATABASE__COLLECTION", "database.collection"),
];

/// Configuration problems detected before any database call is made.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("unsupported environment '{0}'; expected local/staging/production")]
    UnsupportedEnvironment(String),

    #[error("admin password is not configured; set CHATDB_ADMIN__PASSWORD or admin.password_file")]
    MissingPassword,

    #[error("admin.password and admin.password_file are both set; configure exactly one")]
    ConflictingPasswordSources,

    #[error("failed to read admin password file {path}")]
    PasswordFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("admin password file {0} is empty")]
    EmptyPasswordFile(PathBuf),
}

/// Deployment environment the bootstrap is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

impl std::str::FromStr for Environment {
    type Err = SettingsError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "local" => Ok(Self::Local),
            "staging" => Ok(Self::Staging),
            "production" => Ok(Self::Production),
            other => Err(SettingsError::UnsupportedEnvironment(other.to_string())),
        }
    }
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub admin: AdminSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay,
    /// legacy variables and `CHATDB_` variables.
    pub fn load() -> anyhow::Result<Self> {
        // Allow missing `.env` files without failing.
        let _ = dotenvy::dotenv();

        let environment = std::env::var(ENV_VAR_NAME).unwrap_or_else(|_| DEFAULT_ENV.to_string());
        let config_dir = match std::env::var(CONFIG_DIR_ENV) {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => std::env::current_dir()
                .context("unable to resolve current directory")?
                .join("config"),
        };

        Self::load_from(&config_dir, &environment)
    }

    /// Load configuration from an explicit config directory and environment name.
    pub fn load_from(config_dir: &Path, environment: &str) -> anyhow::Result<Self> {
        let parsed_environment: Environment = environment.parse()?;

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{}.toml", environment));

        let mut builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false));

        for &(legacy, preferred, key) in LEGACY_ALIASES {
            if std::env::var_os(preferred).is_some() {
                continue;
            }
            let value = std::env::var(legacy).ok().filter(|value| !value.is_empty());
            builder = builder
                .set_override_option(key, value)
                .with_context(|| format!("failed to apply {} to {}", legacy, key))?;
        }

        let builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        settings.environment = parsed_environment;

        Ok(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_uri")]
    pub uri: String,
    #[serde(default = "DatabaseSettings::default_admin_database")]
    pub admin_database: String,
    #[serde(default = "DatabaseSettings::default_app_database")]
    pub app_database: String,
    #[serde(default = "DatabaseSettings::default_collection")]
    pub collection: String,
    #[serde(default = "DatabaseSettings::default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "DatabaseSettings::default_app_name")]
    pub app_name: String,
}

impl DatabaseSettings {
    fn default_uri() -> String {
        "mongodb://127.0.0.1:27017".to_string()
    }

    fn default_admin_database() -> String {
        "admin".to_string()
    }

    fn default_app_database() -> String {
        "my_database".to_string()
    }

    fn default_collection() -> String {
        "conversations".to_string()
    }

    fn default_connect_timeout_ms() -> u64 {
        10_000
    }

    fn default_app_name() -> String {
        "chatdb-init".to_string()
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            uri: Self::default_uri(),
            admin_database: Self::default_admin_database(),
            app_database: Self::default_app_database(),
            collection: Self::default_collection(),
            connect_timeout_ms: Self::default_connect_timeout_ms(),
            app_name: Self::default_app_name(),
        }
    }
}

/// Administrative credential the bootstrap ensures.
#[derive(Debug, Clone, Deserialize)]
pub struct AdminSettings {
    #[serde(default = "AdminSettings::default_username")]
    pub username: String,
    #[serde(default, deserialize_with = "deserialize_secret")]
    pub password: Option<SecretString>,
    #[serde(default)]
    pub password_file: Option<PathBuf>,
}

impl AdminSettings {
    fn default_username() -> String {
        "root".to_string()
    }

    /// Resolve the admin password from exactly one configured source.
    ///
    /// A password file has its trailing line break removed, matching how
    /// mounted secrets are usually written.
    pub fn resolve_password(&self) -> Result<SecretString, SettingsError> {
        let inline = self
            .password
            .as_ref()
            .filter(|secret| !secret.expose_secret().is_empty());

        match (inline, &self.password_file) {
            (Some(_), Some(_)) => Err(SettingsError::ConflictingPasswordSources),
            (Some(secret), None) => Ok(secret.clone()),
            (None, Some(path)) => {
                let raw = std::fs::read_to_string(path).map_err(|source| {
                    SettingsError::PasswordFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                let trimmed = raw.trim_end_matches(['\r', '\n']);
                if trimmed.is_empty() {
                    return Err(SettingsError::EmptyPasswordFile(path.clone()));
                }
                Ok(SecretString::from(trimmed.to_string()))
            }
            (None, None) => Err(SettingsError::MissingPassword),
        }
    }
}

impl Default for AdminSettings {
    fn default() -> Self {
        Self {
            username: Self::default_username(),
            password: None,
            password_file: None,
        }
    }
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.map(SecretString::from))
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    #[serde(default = "TelemetrySettings::default_log_filter")]
    pub log_filter: String,
}

impl TelemetrySettings {
    fn default_log_filter() -> String {
        "info".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            log_filter: Self::default_log_filter(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}
