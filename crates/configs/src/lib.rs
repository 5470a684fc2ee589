//! # Configuration
//!
//! Layered settings: built-in defaults, then `config/default.toml`, then
//! `config/{HEARTCONNECT_ENV}.toml`, then `HEARTCONNECT__SECTION__KEY`
//! environment variables. A `.env` file is read first when present.

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use secrecy::SecretString;
use serde::Deserialize;
use tracing::debug;

pub const ENV_PREFIX: &str = "HEARTCONNECT";
pub const ENV_SELECTOR: &str = "HEARTCONNECT_ENV";

/// `database.url` value selecting the in-process store.
pub const MEMORY_DATABASE: &str = "memory";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub server: ServerSettings,
    pub database: DatabaseSettings,
    pub identity: IdentitySettings,
    pub email: EmailSettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
    pub cors_origins: Vec<String>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 5000,
            request_timeout_secs: 15,
            cors_origins: vec!["http://localhost:3000".into()],
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// A sqlx SQLite URL, or `memory`.
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: "sqlite://heartconnect.db?mode=rwc".into(),
            max_connections: 5,
        }
    }
}

impl DatabaseSettings {
    pub fn is_memory(&self) -> bool {
        self.url.eq_ignore_ascii_case(MEMORY_DATABASE)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityProvider {
    #[default]
    Supabase,
    Static,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IdentitySettings {
    pub provider: IdentityProvider,
    pub url: Option<String>,
    pub service_key: Option<SecretString>,
    /// When set, access tokens are verified locally instead of by the provider.
    pub jwt_secret: Option<SecretString>,
    pub page_size: u32,
    pub max_pages: u32,
    pub timeout_secs: u64,
    /// JSON seed for the static provider.
    pub seed_file: Option<String>,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            provider: IdentityProvider::default(),
            url: None,
            service_key: None,
            jwt_secret: None,
            page_size: 1000,
            max_pages: 50,
            timeout_secs: 10,
            seed_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmailSettings {
    pub enabled: bool,
    pub api_url: String,
    pub api_key: Option<SecretString>,
    pub from: String,
    pub app_url: String,
    pub timeout_secs: u64,
}

impl Default for EmailSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_url: "https://api.resend.com/emails".into(),
            api_key: None,
            from: "HeartConnect <noreply@heartconnect.com.vn>".into(),
            app_url: String::new(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// Default `EnvFilter` directive; `RUST_LOG` overrides it.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self { level: "info".into(), format: LogFormat::default() }
    }
}

impl Settings {
    /// Loads settings from `./config` and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let profile = std::env::var(ENV_SELECTOR).unwrap_or_else(|_| "development".into());
        Self::load_from(Path::new("config"), &profile, environment())
    }

    /// Loads settings from `dir` for `profile`, with `env` as the top layer.
    pub fn load_from(dir: &Path, profile: &str, env: Environment) -> Result<Self, ConfigError> {
        debug!(dir = %dir.display(), profile, "loading configuration");
        let settings: Settings = Config::builder()
            .add_source(File::from(dir.join("default")).required(false))
            .add_source(File::from(dir.join(profile)).required(false))
            .add_source(env)
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Parses a single TOML document over the defaults.
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        let settings: Settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?
            .try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.identity.page_size == 0 || self.identity.max_pages == 0 {
            return Err(ConfigError::Invalid(
                "identity.page_size and identity.max_pages must be positive".into(),
            ));
        }
        match self.identity.provider {
            IdentityProvider::Supabase => {
                if self.identity.url.as_deref().is_none_or(str::is_empty) {
                    return Err(ConfigError::Invalid("identity.url is required for supabase".into()));
                }
                if self.identity.service_key.is_none() {
                    return Err(ConfigError::Invalid(
                        "identity.service_key is required for supabase".into(),
                    ));
                }
            }
            IdentityProvider::Static => {
                if self.identity.seed_file.is_none() {
                    return Err(ConfigError::Invalid(
                        "identity.seed_file is required for the static provider".into(),
                    ));
                }
            }
        }
        if self.email.enabled && self.email.api_key.is_none() {
            return Err(ConfigError::Invalid("email.api_key is required when email.enabled".into()));
        }
        Ok(())
    }
}

/// The `HEARTCONNECT__SECTION__KEY` environment layer.
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("server.cors_origins")
}
