use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::reconcile::RevenueSource;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub sync: SyncConfig,
    pub attribution: AttributionConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Minimum seconds between the end of one sync and the start of the next
    /// for the same account. The upstream reporting API is rate limited and
    /// returns incomplete data when hammered.
    pub cooldown_secs: u64,
    pub fetch_timeout_secs: u64,
    pub api_token: Option<SecretString>,
}

#[derive(Clone, Debug)]
pub struct AttributionConfig {
    pub revenue_source: RevenueSource,
    pub manual_events_enabled: bool,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub cooldown_secs: Option<u64>,
    pub revenue_source: Option<RevenueSource>,
    pub manual_events_enabled: Option<bool>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sync: SyncConfig { cooldown_secs: 120, fetch_timeout_secs: 45, api_token: None },
            attribution: AttributionConfig {
                revenue_source: RevenueSource::Pixel,
                manual_events_enabled: true,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for RevenueSource {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pixel" => Ok(Self::Pixel),
            "ecommerce" => Ok(Self::Ecommerce),
            other => Err(ConfigError::Validation(format!(
                "unsupported revenue source `{other}` (expected pixel|ecommerce)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("adpulse.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(sync) = patch.sync {
            if let Some(cooldown_secs) = sync.cooldown_secs {
                self.sync.cooldown_secs = cooldown_secs;
            }
            if let Some(fetch_timeout_secs) = sync.fetch_timeout_secs {
                self.sync.fetch_timeout_secs = fetch_timeout_secs;
            }
            if let Some(api_token_value) = sync.api_token {
                self.sync.api_token = Some(api_token_value.into());
            }
        }

        if let Some(attribution) = patch.attribution {
            if let Some(revenue_source) = attribution.revenue_source {
                self.attribution.revenue_source = revenue_source;
            }
            if let Some(manual_events_enabled) = attribution.manual_events_enabled {
                self.attribution.manual_events_enabled = manual_events_enabled;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("ADPULSE_SYNC_COOLDOWN_SECS") {
            self.sync.cooldown_secs = parse_u64("ADPULSE_SYNC_COOLDOWN_SECS", &value)?;
        }
        if let Some(value) = read_env("ADPULSE_SYNC_FETCH_TIMEOUT_SECS") {
            self.sync.fetch_timeout_secs = parse_u64("ADPULSE_SYNC_FETCH_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("ADPULSE_SYNC_API_TOKEN") {
            self.sync.api_token = Some(value.into());
        }

        if let Some(value) = read_env("ADPULSE_ATTRIBUTION_REVENUE_SOURCE") {
            self.attribution.revenue_source = value.parse()?;
        }
        if let Some(value) = read_env("ADPULSE_ATTRIBUTION_MANUAL_EVENTS") {
            self.attribution.manual_events_enabled =
                parse_bool("ADPULSE_ATTRIBUTION_MANUAL_EVENTS", &value)?;
        }

        let log_level = read_env("ADPULSE_LOGGING_LEVEL").or_else(|| read_env("ADPULSE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("ADPULSE_LOGGING_FORMAT").or_else(|| read_env("ADPULSE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(cooldown_secs) = overrides.cooldown_secs {
            self.sync.cooldown_secs = cooldown_secs;
        }
        if let Some(revenue_source) = overrides.revenue_source {
            self.attribution.revenue_source = revenue_source;
        }
        if let Some(manual_events_enabled) = overrides.manual_events_enabled {
            self.attribution.manual_events_enabled = manual_events_enabled;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sync.cooldown_secs == 0 || self.sync.cooldown_secs > 3_600 {
            return Err(ConfigError::Validation(
                "sync.cooldown_secs must be in range 1..=3600".to_string(),
            ));
        }
        if self.sync.fetch_timeout_secs == 0 || self.sync.fetch_timeout_secs > 300 {
            return Err(ConfigError::Validation(
                "sync.fetch_timeout_secs must be in range 1..=300".to_string(),
            ));
        }

        let level = self.logging.level.trim().to_ascii_lowercase();
        match level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
            _ => Err(ConfigError::Validation(
                "logging.level must be one of trace|debug|info|warn|error".to_string(),
            )),
        }
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("adpulse.toml"), PathBuf::from("config/adpulse.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.parse::<bool>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    sync: Option<SyncPatch>,
    attribution: Option<AttributionPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SyncPatch {
    cooldown_secs: Option<u64>,
    fetch_timeout_secs: Option<u64>,
    api_token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct AttributionPatch {
    revenue_source: Option<RevenueSource>,
    manual_events_enabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
