// Configuration for discovery, registration and dispatch

use crate::error::ConfigurationError;
use crate::logging::{LogConfig, LogFormat, LogLevel};
use crate::mediator::MediatorOptions;
use crate::provider::AmbiguityPolicy;
use crate::registry::HandlerSource;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Prefix of the environment variables read by [`CoordixConfig::apply_env`]
pub const ENV_PREFIX: &str = "COORDIX_";

/// Which handlers discovery binds
///
/// Leave both lists empty to scan every registration. Setting both is a
/// configuration error once discovery runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    pub modules: Vec<String>,
    pub prefixes: Vec<String>,
}

impl DiscoveryConfig {
    /// Discovery sources described by this configuration
    pub fn sources(&self) -> Vec<HandlerSource> {
        self.modules
            .iter()
            .cloned()
            .map(HandlerSource::Module)
            .chain(self.prefixes.iter().cloned().map(HandlerSource::Prefix))
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    pub ambiguity: AmbiguityPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: LogLevel,
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig::new().level(self.level).format(self.format)
    }
}

/// Complete mediator configuration
///
/// ```toml
/// [discovery]
/// prefixes = ["advanced_sample::"]
///
/// [registry]
/// ambiguity = "reject"
///
/// [mediator]
/// enable_logging = true
///
/// [logging]
/// level = "info"
/// format = "pretty"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordixConfig {
    pub discovery: DiscoveryConfig,
    pub registry: RegistryConfig,
    pub mediator: MediatorOptions,
    pub logging: LoggingConfig,
}

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Toml,
}

impl FileFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "toml" => Some(FileFormat::Toml),
            _ => None,
        }
    }
}

impl CoordixConfig {
    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .ok_or_else(|| ConfigurationError::Load("No file extension found".to_string()))?;
        let format = FileFormat::from_extension(ext)
            .ok_or_else(|| ConfigurationError::Load(format!("Unsupported format: {}", ext)))?;

        let content = fs::read_to_string(path)?;
        Self::parse(&content, format)
    }

    /// Parse configuration text
    pub fn parse(content: &str, format: FileFormat) -> Result<Self, ConfigurationError> {
        match format {
            FileFormat::Toml => {
                toml::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))
            }
            FileFormat::Json => {
                serde_json::from_str(content).map_err(|e| ConfigurationError::Parse(e.to_string()))
            }
        }
    }

    /// Override fields from the process environment
    ///
    /// See [`apply_vars`](Self::apply_vars) for the recognized variables.
    pub fn apply_env(self) -> Result<Self, ConfigurationError> {
        self.apply_vars(std::env::vars())
    }

    /// Override fields from `COORDIX_*` variables
    ///
    /// - `COORDIX_MODULES`, `COORDIX_PREFIXES`: comma-separated lists
    /// - `COORDIX_AMBIGUITY`: `reject` or `last_wins`
    /// - `COORDIX_ENABLE_LOGGING`: `true`/`false`/`1`/`0`
    /// - `COORDIX_LOG_LEVEL`: `trace` through `error`
    pub fn apply_vars<I, K, V>(mut self, vars: I) -> Result<Self, ConfigurationError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();

            match name {
                "MODULES" => self.discovery.modules = split_list(value),
                "PREFIXES" => self.discovery.prefixes = split_list(value),
                "AMBIGUITY" => {
                    self.registry.ambiguity = match value.to_lowercase().as_str() {
                        "reject" => AmbiguityPolicy::Reject,
                        "last_wins" => AmbiguityPolicy::LastWins,
                        other => {
                            return Err(ConfigurationError::Parse(format!(
                                "Invalid {}AMBIGUITY: {}",
                                ENV_PREFIX, other
                            )));
                        }
                    }
                }
                "ENABLE_LOGGING" => {
                    self.mediator.enable_logging = match value.to_lowercase().as_str() {
                        "1" | "true" => true,
                        "0" | "false" => false,
                        _ => {
                            return Err(ConfigurationError::Parse(format!(
                                "Invalid {}ENABLE_LOGGING: {}",
                                ENV_PREFIX, value
                            )));
                        }
                    };
                }
                "LOG_LEVEL" => {
                    self.logging.level = LogLevel::parse(value).ok_or_else(|| {
                        ConfigurationError::Parse(format!("Invalid {}LOG_LEVEL: {}", ENV_PREFIX, value))
                    })?;
                }
                _ => {}
            }
        }

        Ok(self)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_toml() {
        let config = CoordixConfig::parse(
            r#"
            [discovery]
            prefixes = ["advanced_sample::"]

            [registry]
            ambiguity = "last_wins"

            [logging]
            level = "debug"
            format = "pretty"
            "#,
            FileFormat::Toml,
        )
        .unwrap();

        assert_eq!(config.discovery.prefixes, vec!["advanced_sample::"]);
        assert_eq!(config.registry.ambiguity, AmbiguityPolicy::LastWins);
        assert_eq!(config.logging.level, LogLevel::Debug);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.mediator.enable_logging);
    }

    #[test]
    fn test_parse_json() {
        let config = CoordixConfig::parse(
            r#"{"discovery": {"modules": ["app::email"]}, "mediator": {"enable_logging": false}}"#,
            FileFormat::Json,
        )
        .unwrap();

        assert_eq!(config.discovery.sources(), vec![HandlerSource::module("app::email")]);
        assert!(!config.mediator.enable_logging);
        assert_eq!(config.registry.ambiguity, AmbiguityPolicy::Reject);
    }

    #[test]
    fn test_parse_invalid() {
        let err = CoordixConfig::parse("[registry]\nambiguity = \"maybe\"", FileFormat::Toml)
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = CoordixConfig::from_file("coordix.yaml").unwrap_err();
        assert!(matches!(err, ConfigurationError::Load(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = CoordixConfig::from_file("does-not-exist-12345.toml").unwrap_err();
        assert!(matches!(err, ConfigurationError::Io(_)));
    }

    #[test]
    fn test_mixed_sources_are_preserved() {
        let config = DiscoveryConfig {
            modules: vec!["a".to_string()],
            prefixes: vec!["b".to_string()],
        };
        assert_eq!(
            config.sources(),
            vec![HandlerSource::module("a"), HandlerSource::prefix("b")]
        );
    }

    #[test]
    fn test_apply_vars() {
        let config = CoordixConfig::default()
            .apply_vars([
                ("COORDIX_PREFIXES", "app::email, app::billing,"),
                ("COORDIX_AMBIGUITY", "LAST_WINS"),
                ("COORDIX_ENABLE_LOGGING", "0"),
                ("COORDIX_LOG_LEVEL", "warn"),
                ("UNRELATED", "x"),
            ])
            .unwrap();

        assert_eq!(config.discovery.prefixes, vec!["app::email", "app::billing"]);
        assert_eq!(config.registry.ambiguity, AmbiguityPolicy::LastWins);
        assert!(!config.mediator.enable_logging);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_apply_vars_rejects_bad_level() {
        let err = CoordixConfig::default()
            .apply_vars([("COORDIX_LOG_LEVEL", "loud")])
            .unwrap_err();
        assert!(err.to_string().contains("LOG_LEVEL"));
    }

    #[test]
    fn test_apply_vars_rejects_bad_enable_logging() {
        let err = CoordixConfig::default()
            .apply_vars([("COORDIX_ENABLE_LOGGING", "maybe")])
            .unwrap_err();
        assert!(matches!(err, ConfigurationError::Parse(_)));
        assert!(err.to_string().contains("ENABLE_LOGGING"));

        let config = CoordixConfig::default()
            .apply_vars([("COORDIX_ENABLE_LOGGING", "FALSE")])
            .unwrap();
        assert!(!config.mediator.enable_logging);
    }

    #[test]
    fn test_logging_section_to_log_config() {
        let section = LoggingConfig {
            level: LogLevel::Error,
            format: LogFormat::Compact,
        };
        let config = section.to_log_config();
        assert_eq!(config.level, LogLevel::Error);
        assert_eq!(config.format, LogFormat::Compact);
    }
}
