use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use serde::Deserialize;

const DEFAULT_ENV: &str = "local";
const ENV_VAR_NAME: &str = "VERDICT_ENV";
const CONFIG_DIR_ENV: &str = "VERDICT_CONFIG_DIR";
const ENV_PREFIX: &str = "VERDICT";

/// Signing secret used when none is configured. Refused in production.
pub const DEVELOPMENT_SECRET: &str = "verdict-development-secret-change-me";

/// Deployment environment the application is running in.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Local,
    Staging,
    Production,
}

/// Top-level configuration structure loaded from layered sources.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub auth: AuthSettings,
    #[serde(default)]
    pub mail: MailSettings,
    #[serde(default)]
    pub api: ApiSettings,
}

impl Settings {
    /// Load configuration by layering `.env`, base file, environment overlay and
    /// `VERDICT__SECTION__KEY` variables.
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

        let base_path = config_dir.join("base.toml");
        let environment_path = config_dir.join(format!("{environment}.toml"));

        let builder = config::Config::builder()
            .add_source(config::File::from(base_path).required(false))
            .add_source(config::File::from(environment_path).required(false))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            );

        let cfg = builder
            .build()
            .with_context(|| "failed to build configuration")?;

        let mut settings: Settings = cfg
            .try_deserialize()
            .with_context(|| "failed to deserialize configuration")?;

        // Override environment field with parsed enum variant.
        settings.environment = match environment.as_str() {
            "local" => Environment::Local,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(anyhow!(
                    "unsupported environment '{}'; expected local/staging/production",
                    other
                ));
            }
        };

        settings.validate()?;
        Ok(settings)
    }

    /// Reject combinations that are unsafe to run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.environment == Environment::Production && self.auth.secret_key == DEVELOPMENT_SECRET
        {
            bail!("auth.secret_key must be configured in production");
        }
        if self.auth.secret_key.len() < 16 {
            bail!("auth.secret_key must be at least 16 bytes long");
        }
        if self.api.page_size == 0 {
            bail!("api.page_size must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "ServerSettings::default_host")]
    pub host: String,
    #[serde(default = "ServerSettings::default_port")]
    pub port: u16,
    #[serde(default = "ServerSettings::default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl ServerSettings {
    fn default_host() -> String {
        "0.0.0.0".to_string()
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_request_timeout_ms() -> u64 {
        15000
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: Self::default_host(),
            port: Self::default_port(),
            request_timeout_ms: Self::default_request_timeout_ms(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "DatabaseSettings::default_url")]
    pub url: String,
    #[serde(default = "DatabaseSettings::default_max_connections")]
    pub max_connections: u32,
}

impl DatabaseSettings {
    fn default_url() -> String {
        "sqlite://verdict.db".to_string()
    }

    fn default_max_connections() -> u32 {
        8
    }
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            url: Self::default_url(),
            max_connections: Self::default_max_connections(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelemetrySettings {
    #[serde(default)]
    pub log_format: LogFormat,
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "TelemetrySettings::default_filter")]
    pub filter: String,
}

impl TelemetrySettings {
    fn default_filter() -> String {
        "info,sqlx=warn".to_string()
    }
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            filter: Self::default_filter(),
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

#[derive(Debug, Clone, Deserialize)]
pub struct AuthSettings {
    #[serde(default = "AuthSettings::default_secret_key")]
    pub secret_key: String,
    #[serde(default = "AuthSettings::default_access_token_ttl_secs")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "AuthSettings::default_confirmation_code_ttl_secs")]
    pub confirmation_code_ttl_secs: u64,
}

impl AuthSettings {
    fn default_secret_key() -> String {
        DEVELOPMENT_SECRET.to_string()
    }

    fn default_access_token_ttl_secs() -> u64 {
        24 * 60 * 60
    }

    fn default_confirmation_code_ttl_secs() -> u64 {
        3 * 24 * 60 * 60
    }
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            secret_key: Self::default_secret_key(),
            access_token_ttl_secs: Self::default_access_token_ttl_secs(),
            confirmation_code_ttl_secs: Self::default_confirmation_code_ttl_secs(),
        }
    }
}

/// Where outgoing mail ends up.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MailBackend {
    /// Write messages to the log.
    #[default]
    Log,
    /// Write each message to a file under `outbox_dir`.
    File,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MailSettings {
    #[serde(default)]
    pub backend: MailBackend,
    #[serde(default = "MailSettings::default_from_address")]
    pub from_address: String,
    #[serde(default = "MailSettings::default_outbox_dir")]
    pub outbox_dir: PathBuf,
}

impl MailSettings {
    fn default_from_address() -> String {
        "noreply@verdict.local".to_string()
    }

    fn default_outbox_dir() -> PathBuf {
        PathBuf::from("sent_emails")
    }
}

impl Default for MailSettings {
    fn default() -> Self {
        Self {
            backend: MailBackend::default(),
            from_address: Self::default_from_address(),
            outbox_dir: Self::default_outbox_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    #[serde(default = "ApiSettings::default_page_size")]
    pub page_size: u32,
}

impl ApiSettings {
    fn default_page_size() -> u32 {
        10
    }
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            page_size: Self::default_page_size(),
        }
    }
}
