use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::utils::{ApiError, ApiResult, CultureTag, SupportedCultures};

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub localization: LocalizationConfig,
    pub correlation: CorrelationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalizationConfig {
    pub supported_cultures: Vec<String>,
    pub default_culture: String,
    /// Prefix the application is mounted under, e.g. "/app1"
    pub base_path: String,
    /// Path segment of the realtime hub, e.g. "_blazor"
    pub hub_path: String,
    pub max_request_body_bytes: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrelationStrategy {
    /// Process-wide concurrent map
    Memory,
    /// Client-held cookie carrying the whole mapping
    Cookie,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    pub strategy: CorrelationStrategy,
    pub cookie_name: String,
    /// Cookie lifetime in seconds (accepts "60", "60s", "2m")
    #[serde(deserialize_with = "deserialize_duration_secs")]
    pub cookie_max_age: u64,
    pub cookie_path: String,
    pub cookie_secure: bool,
}

impl Config {
    /// Load configuration with environment variable override support
    ///
    /// Loading order:
    /// 1. Load from the explicit path, or the first config.toml found
    /// 2. Override with environment variables (prefixed with APP_)
    /// 3. Validate the final configuration
    pub fn load(explicit_path: Option<&Path>) -> Result<Self, anyhow::Error> {
        let mut config = match explicit_path {
            Some(path) => Self::from_toml(path)?,
            None => match Self::find_config_file() {
                Some(path) => Self::from_toml(Path::new(path))?,
                None => {
                    tracing::warn!("Configuration file not found, using defaults");
                    Config::default()
                },
            },
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - APP_SERVER_HOST / APP_SERVER_PORT
    /// - APP_LOG_LEVEL: Logging level (e.g., "info,culture_bridge=debug")
    /// - APP_SUPPORTED_CULTURES: Comma separated list (e.g., "en,fr")
    /// - APP_DEFAULT_CULTURE
    /// - APP_BASE_PATH / APP_HUB_PATH
    /// - APP_CORRELATION_STRATEGY: "memory" or "cookie"
    /// - APP_COOKIE_NAME
    /// - APP_COOKIE_MAX_AGE: Cookie lifetime (accepts "60", "60s", "2m")
    fn apply_env_overrides(&mut self) {
        if let Ok(host) = std::env::var("APP_SERVER_HOST") {
            self.server.host = host;
            tracing::info!("Override server.host from env: {}", self.server.host);
        }

        if let Ok(port) = std::env::var("APP_SERVER_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
            tracing::info!("Override server.port from env: {}", self.server.port);
        }

        if let Ok(level) = std::env::var("APP_LOG_LEVEL") {
            self.logging.level = level;
            tracing::info!("Override logging.level from env: {}", self.logging.level);
        }

        if let Ok(cultures) = std::env::var("APP_SUPPORTED_CULTURES") {
            self.localization.supported_cultures = cultures
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect();
            tracing::info!(
                "Override localization.supported_cultures from env: {:?}",
                self.localization.supported_cultures
            );
        }

        if let Ok(culture) = std::env::var("APP_DEFAULT_CULTURE") {
            self.localization.default_culture = culture;
            tracing::info!(
                "Override localization.default_culture from env: {}",
                self.localization.default_culture
            );
        }

        if let Ok(base_path) = std::env::var("APP_BASE_PATH") {
            self.localization.base_path = base_path;
            tracing::info!("Override localization.base_path from env: {}", self.localization.base_path);
        }

        if let Ok(hub_path) = std::env::var("APP_HUB_PATH") {
            self.localization.hub_path = hub_path;
            tracing::info!("Override localization.hub_path from env: {}", self.localization.hub_path);
        }

        if let Ok(strategy) = std::env::var("APP_CORRELATION_STRATEGY") {
            match strategy.trim().to_lowercase().as_str() {
                "memory" => self.correlation.strategy = CorrelationStrategy::Memory,
                "cookie" => self.correlation.strategy = CorrelationStrategy::Cookie,
                other => tracing::warn!(
                    "Invalid APP_CORRELATION_STRATEGY '{}' (keep {:?})",
                    other,
                    self.correlation.strategy
                ),
            }
        }

        if let Ok(name) = std::env::var("APP_COOKIE_NAME") {
            self.correlation.cookie_name = name;
            tracing::info!("Override correlation.cookie_name from env: {}", self.correlation.cookie_name);
        }

        if let Ok(max_age) = std::env::var("APP_COOKIE_MAX_AGE") {
            match parse_duration_to_secs(&max_age) {
                Ok(val) => {
                    self.correlation.cookie_max_age = val;
                    tracing::info!(
                        "Override correlation.cookie_max_age from env: {}",
                        self.correlation.cookie_max_age
                    );
                },
                Err(e) => tracing::warn!(
                    "Invalid APP_COOKIE_MAX_AGE '{}': {} (keep {})",
                    max_age,
                    e,
                    self.correlation.cookie_max_age
                ),
            }
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.server.port == 0 {
            anyhow::bail!("Server port cannot be 0");
        }

        self.localization.validate()?;
        self.correlation.validate()?;

        Ok(())
    }

    fn find_config_file() -> Option<&'static str> {
        let possible_paths =
            ["conf/config.toml", "config.toml", "./conf/config.toml", "./config.toml"];

        possible_paths.into_iter().find(|path| Path::new(path).exists())
    }

    fn from_toml(path: &Path) -> Result<Self, anyhow::Error> {
        let content = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}

impl LocalizationConfig {
    pub fn supported(&self) -> ApiResult<SupportedCultures> {
        SupportedCultures::parse(&self.supported_cultures)
    }

    /// Default culture, in the supported set's spelling
    pub fn default_culture(&self) -> ApiResult<CultureTag> {
        let supported = self.supported()?;
        let requested = CultureTag::new(self.default_culture.as_str())?;
        supported.find(requested.as_str()).cloned().ok_or_else(|| {
            ApiError::configuration(format!(
                "default culture '{}' is not in the supported set",
                self.default_culture
            ))
        })
    }

    /// Base path normalized to "" or "/segment[/segment]" without trailing slash
    pub fn normalized_base_path(&self) -> String {
        let trimmed = self.base_path.trim().trim_matches('/');
        if trimmed.is_empty() { String::new() } else { format!("/{}", trimmed) }
    }

    pub fn normalized_hub_path(&self) -> String {
        self.hub_path.trim().trim_matches('/').to_string()
    }

    fn validate(&self) -> ApiResult<()> {
        self.default_culture()?;

        let hub = self.normalized_hub_path();
        if hub.is_empty() || hub.contains('/') {
            return Err(ApiError::configuration(format!(
                "hub path '{}' must be a single non-empty segment",
                self.hub_path
            )));
        }

        if self.max_request_body_bytes == 0 {
            return Err(ApiError::configuration("max_request_body_bytes must be > 0"));
        }

        Ok(())
    }
}

impl CorrelationConfig {
    fn validate(&self) -> ApiResult<()> {
        let name = self.cookie_name.trim();
        let separators = |c: char| {
            c.is_ascii_control() || c.is_whitespace() || "()<>@,;:\\\"/[]?={}".contains(c)
        };
        if name.is_empty() || name.chars().any(separators) {
            return Err(ApiError::configuration(format!(
                "cookie name '{}' is not a valid cookie token",
                self.cookie_name
            )));
        }

        if self.cookie_max_age == 0 {
            return Err(ApiError::configuration("correlation.cookie_max_age must be > 0"));
        }

        Ok(())
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info,culture_bridge=debug".to_string(), file: None }
    }
}

impl Default for LocalizationConfig {
    fn default() -> Self {
        Self {
            supported_cultures: vec!["en".to_string(), "fr".to_string()],
            default_culture: "en".to_string(),
            base_path: String::new(),
            hub_path: "_blazor".to_string(),
            max_request_body_bytes: 64 * 1024,
        }
    }
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            strategy: CorrelationStrategy::Cookie,
            cookie_name: ".App.CircuitCulture".to_string(),
            cookie_max_age: 60,
            cookie_path: "/".to_string(),
            cookie_secure: false,
        }
    }
}

// =========================
// Helpers for parsing values
// =========================

fn parse_duration_to_secs(input: &str) -> Result<u64, String> {
    // Accept plain numbers (treated as seconds)
    if let Ok(val) = input.trim().parse::<u64>() {
        return Ok(val);
    }

    let s = input.trim().to_lowercase();
    let (num_str, unit) = s.split_at(s.chars().take_while(|c| c.is_ascii_digit()).count());
    if num_str.is_empty() || unit.is_empty() {
        return Err("missing number or unit".into());
    }
    let n: u64 = num_str.parse().map_err(|_| "invalid number".to_string())?;
    let secs = match unit {
        "s" | "sec" | "secs" | "second" | "seconds" => Some(n),
        "m" | "min" | "mins" | "minute" | "minutes" => n.checked_mul(60),
        "h" | "hr" | "hour" | "hours" => n.checked_mul(60 * 60),
        _ => return Err(format!("unsupported unit: {}", unit)),
    };
    secs.ok_or_else(|| "value too large".to_string())
}

// Accepts numeric or human-friendly string values
fn deserialize_duration_secs<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct Visitor;
    impl<'de> serde::de::Visitor<'de> for Visitor {
        type Value = u64;
        fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
            write!(f, "a number of seconds or a string like '60s', '2m'")
        }
        fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E> {
            Ok(v)
        }
        fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            if v >= 0 { Ok(v as u64) } else { Err(E::custom("negative not allowed")) }
        }
        fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            parse_duration_to_secs(v).map_err(E::custom)
        }
    }
    deserializer.deserialize_any(Visitor)
}
