use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

const DEFAULT_CONFIG_FILES: &[&str] = &[
    "tether.toml",
    "config/tether.toml",
    "crates/config/tether.toml",
    "../tether.toml",
    "../config/tether.toml",
];

/// Longest token lifetime accepted: ten years.
pub const MAX_TOKEN_TTL_SECONDS: u64 = 10 * 365 * 86_400;

/// Secret used when nothing else is configured. The server logs a warning when it starts with it.
pub const DEV_JWT_SECRET: &str = "tether-dev-secret-change-me";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    #[serde(default)]
    pub hub: HubConfig,
}

impl AppConfig {
    /// Reject settings that would leave the server unable to run.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.database.max_connections == 0 {
            bail!("database.max_connections must be greater than zero");
        }
        if self.auth.jwt_secret.trim().is_empty() {
            bail!("auth.jwt_secret must not be empty");
        }
        if self.auth.token_ttl_seconds == 0 || self.auth.token_ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            bail!("auth.token_ttl_seconds must be between 1 and {MAX_TOKEN_TTL_SECONDS}");
        }
        if self.hub.event_queue_capacity == 0 {
            bail!("hub.event_queue_capacity must be greater than zero");
        }
        if self.hub.connection_buffer == 0 {
            bail!("hub.connection_buffer must be greater than zero");
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    pub address: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 7070,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://tether.db".to_string(),
            max_connections: 10,
        }
    }
}

/// Settings for the bearer-token identity provider.
///
/// ```
/// use tether_config::AuthConfig;
///
/// let auth = AuthConfig::default();
/// assert_eq!(auth.issuer, "tether");
/// assert_eq!(auth.token_ttl_seconds, 86_400);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    #[serde(default = "AuthConfig::default_secret")]
    pub jwt_secret: String,
    #[serde(default = "AuthConfig::default_issuer")]
    pub issuer: String,
    #[serde(default = "AuthConfig::default_audience")]
    pub audience: String,
    #[serde(default = "AuthConfig::default_token_ttl")]
    pub token_ttl_seconds: u64,
}

impl AuthConfig {
    fn default_secret() -> String {
        DEV_JWT_SECRET.to_string()
    }

    fn default_issuer() -> String {
        "tether".to_string()
    }

    fn default_audience() -> String {
        "tether-clients".to_string()
    }

    const fn default_token_ttl() -> u64 {
        86_400
    }

    pub fn uses_dev_secret(&self) -> bool {
        self.jwt_secret == DEV_JWT_SECRET
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: Self::default_secret(),
            issuer: Self::default_issuer(),
            audience: Self::default_audience(),
            token_ttl_seconds: Self::default_token_ttl(),
        }
    }
}

/// Tuning for the in-process connection hub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Capacity of the FIFO feeding the broadcast loop.
    #[serde(default = "HubConfig::default_event_queue_capacity")]
    pub event_queue_capacity: usize,
    /// Outbound frames buffered per connection before it counts as a failed write.
    #[serde(default = "HubConfig::default_connection_buffer")]
    pub connection_buffer: usize,
}

impl HubConfig {
    const fn default_event_queue_capacity() -> usize {
        1024
    }

    const fn default_connection_buffer() -> usize {
        64
    }
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            event_queue_capacity: Self::default_event_queue_capacity(),
            connection_buffer: Self::default_connection_buffer(),
        }
    }
}

/// Load the application configuration by combining defaults, files, and environment overrides.
///
/// ```
/// use tether_config::load;
///
/// std::env::remove_var("TETHER_CONFIG");
///
/// let config = load().expect("configuration should load with defaults");
/// assert!(!config.http.address.is_empty());
/// ```
pub fn load() -> anyhow::Result<AppConfig> {
    let defaults = AppConfig::default();

    let token_ttl = i64::try_from(defaults.auth.token_ttl_seconds).unwrap_or(i64::MAX);
    let queue_capacity = i64::try_from(defaults.hub.event_queue_capacity).unwrap_or(i64::MAX);
    let connection_buffer = i64::try_from(defaults.hub.connection_buffer).unwrap_or(i64::MAX);

    let mut builder = config::Config::builder()
        .set_default("http.address", defaults.http.address.clone())?
        .set_default("http.port", i64::from(defaults.http.port))?
        .set_default("database.url", defaults.database.url.clone())?
        .set_default(
            "database.max_connections",
            i64::from(defaults.database.max_connections),
        )?
        .set_default("auth.jwt_secret", defaults.auth.jwt_secret.clone())?
        .set_default("auth.issuer", defaults.auth.issuer.clone())?
        .set_default("auth.audience", defaults.auth.audience.clone())?
        .set_default("auth.token_ttl_seconds", token_ttl)?
        .set_default("hub.event_queue_capacity", queue_capacity)?
        .set_default("hub.connection_buffer", connection_buffer)?;

    let mut config_file_attached = false;

    if let Ok(path) = std::env::var("TETHER_CONFIG") {
        builder = builder.add_source(config::File::from(PathBuf::from(&path)));
        config_file_attached = true;
        debug!(path, "loading configuration via TETHER_CONFIG");
    } else if let Ok(cwd) = std::env::current_dir() {
        let fallback = DEFAULT_CONFIG_FILES
            .iter()
            .map(|candidate| cwd.join(candidate))
            .find(|path| path.exists());

        if let Some(path) = fallback {
            debug!(path = %path.display(), "loading configuration file");
            builder = builder.add_source(config::File::from(path));
            config_file_attached = true;
        }
    }

    if !config_file_attached {
        debug!("no configuration file found, relying on defaults and environment overrides");
    }

    builder = builder.add_source(config::Environment::with_prefix("TETHER").separator("__"));

    let cfg = builder.build().context("unable to build configuration")?;

    let config = cfg
        .try_deserialize::<AppConfig>()
        .context("invalid configuration")?;

    config.validate().context("invalid configuration")?;

    debug!(
        http = %format!("{}:{}", config.http.address, config.http.port),
        database = %config.database.url,
        "loaded backend configuration"
    );
    Ok(config)
}
