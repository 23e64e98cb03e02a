use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::time::Duration;

pub const DEFAULT_WS_BASE_URL: &str = "wss://stream.binance.us:9443/ws";
pub const DEFAULT_REST_BASE_URL: &str = "https://api.binance.us";
pub const TESTNET_WS_BASE_URL: &str = "wss://testnet.binance.vision/ws";
pub const TESTNET_REST_BASE_URL: &str = "https://testnet.binance.vision";

/// Listen keys expire 60 minutes after the last renewal.
pub const DEFAULT_KEEP_ALIVE_SECS: u64 = 50;
pub const DEFAULT_RECONNECT_DELAY_SECS: u64 = 30;

#[derive(Debug, Clone)]
pub struct StreamConfig {
    pub api_key: Secret<String>,
    pub testnet: bool,
    pub ws_base_url: Option<String>,
    pub rest_base_url: Option<String>,
    pub keep_alive_interval_secs: u64,
    pub reconnect_delay_secs: u64,
}

// Custom Serialize implementation - never expose secrets in serialization
impl Serialize for StreamConfig {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("StreamConfig", 6)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("testnet", &self.testnet)?;
        state.serialize_field("ws_base_url", &self.ws_base_url)?;
        state.serialize_field("rest_base_url", &self.rest_base_url)?;
        state.serialize_field("keep_alive_interval_secs", &self.keep_alive_interval_secs)?;
        state.serialize_field("reconnect_delay_secs", &self.reconnect_delay_secs)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for StreamConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct StreamConfigHelper {
            #[serde(default)]
            api_key: String,
            #[serde(default)]
            testnet: bool,
            ws_base_url: Option<String>,
            rest_base_url: Option<String>,
            keep_alive_interval_secs: Option<u64>,
            reconnect_delay_secs: Option<u64>,
        }

        let helper = StreamConfigHelper::deserialize(deserializer)?;
        Ok(Self {
            api_key: Secret::new(helper.api_key),
            testnet: helper.testnet,
            ws_base_url: helper.ws_base_url,
            rest_base_url: helper.rest_base_url,
            keep_alive_interval_secs: helper
                .keep_alive_interval_secs
                .unwrap_or(DEFAULT_KEEP_ALIVE_SECS),
            reconnect_delay_secs: helper
                .reconnect_delay_secs
                .unwrap_or(DEFAULT_RECONNECT_DELAY_SECS),
        })
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self::read_only()
    }
}

impl StreamConfig {
    /// Create a new configuration with an API key for user data streams
    #[must_use]
    pub fn new(api_key: String) -> Self {
        Self {
            api_key: Secret::new(api_key),
            ..Self::read_only()
        }
    }

    /// Configuration for public market data streams only
    #[must_use]
    pub fn read_only() -> Self {
        Self {
            api_key: Secret::new(String::new()),
            testnet: false,
            ws_base_url: None,
            rest_base_url: None,
            keep_alive_interval_secs: DEFAULT_KEEP_ALIVE_SECS,
            reconnect_delay_secs: DEFAULT_RECONNECT_DELAY_SECS,
        }
    }

    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `{PREFIX}_API_KEY` (e.g., `BINANCE_API_KEY`)
    /// - `{PREFIX}_TESTNET` (optional, defaults to false)
    /// - `{PREFIX}_WS_BASE_URL` (optional)
    /// - `{PREFIX}_REST_BASE_URL` (optional)
    /// - `{PREFIX}_KEEP_ALIVE_SECS` (optional, defaults to 50)
    /// - `{PREFIX}_RECONNECT_DELAY_SECS` (optional, defaults to 30)
    pub fn from_env(prefix: &str) -> Result<Self, ConfigError> {
        let prefix = prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;

        let testnet = env::var(format!("{}_TESTNET", prefix))
            .unwrap_or_else(|_| "false".to_string())
            .parse::<bool>()
            .unwrap_or(false);

        Ok(Self {
            api_key: Secret::new(api_key),
            testnet,
            ws_base_url: env::var(format!("{}_WS_BASE_URL", prefix)).ok(),
            rest_base_url: env::var(format!("{}_REST_BASE_URL", prefix)).ok(),
            keep_alive_interval_secs: parse_secs_var(
                &format!("{}_KEEP_ALIVE_SECS", prefix),
                DEFAULT_KEEP_ALIVE_SECS,
            )?,
            reconnect_delay_secs: parse_secs_var(
                &format!("{}_RECONNECT_DELAY_SECS", prefix),
                DEFAULT_RECONNECT_DELAY_SECS,
            )?,
        })
    }

    /// Create configuration from .env file and environment variables
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(prefix, ".env")
    }

    /// Create configuration from a specific .env file path
    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(prefix: &str, env_file_path: &str) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // No file, fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(prefix)
    }

    /// Check if an API key is configured for user data streams
    #[must_use]
    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty()
    }

    #[must_use]
    pub const fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    #[must_use]
    pub fn ws_base_url(mut self, url: String) -> Self {
        self.ws_base_url = Some(url);
        self
    }

    #[must_use]
    pub fn rest_base_url(mut self, url: String) -> Self {
        self.rest_base_url = Some(url);
        self
    }

    #[must_use]
    pub const fn keep_alive_interval_secs(mut self, secs: u64) -> Self {
        self.keep_alive_interval_secs = secs;
        self
    }

    #[must_use]
    pub const fn reconnect_delay_secs(mut self, secs: u64) -> Self {
        self.reconnect_delay_secs = secs;
        self
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// WebSocket origin, honoring an explicit override before the testnet flag
    pub fn resolved_ws_base_url(&self) -> String {
        self.ws_base_url.clone().unwrap_or_else(|| {
            if self.testnet {
                TESTNET_WS_BASE_URL.to_string()
            } else {
                DEFAULT_WS_BASE_URL.to_string()
            }
        })
    }

    pub fn resolved_rest_base_url(&self) -> String {
        self.rest_base_url.clone().unwrap_or_else(|| {
            if self.testnet {
                TESTNET_REST_BASE_URL.to_string()
            } else {
                DEFAULT_REST_BASE_URL.to_string()
            }
        })
    }

    pub fn keep_alive_interval(&self) -> Duration {
        Duration::from_secs(self.keep_alive_interval_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(self.reconnect_delay_secs)
    }

    /// Reject settings that would make the session loop misbehave
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keep_alive_interval_secs == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "keep-alive interval must be greater than zero".to_string(),
            ));
        }
        if self.reconnect_delay_secs == 0 {
            return Err(ConfigError::InvalidConfiguration(
                "reconnect delay must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_secs_var(name: &str, default: u64) -> Result<u64, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw.parse::<u64>().map_err(|e| {
            ConfigError::InvalidConfiguration(format!("{} must be a number of seconds: {}", name, e))
        }),
        Err(_) => Ok(default),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
