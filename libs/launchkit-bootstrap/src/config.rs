//! Layered service configuration.
//!
//! Sources, later ones winning:
//! 1. built-in defaults
//! 2. an optional YAML file
//! 3. environment variables prefixed with [`ENV_PREFIX`], `__` separating
//!    nested keys (`LAUNCHKIT__SERVICE__SOCKET_GROUP=Web`)

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Yaml};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

pub const ENV_PREFIX: &str = "LAUNCHKIT__";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file does not exist: {}", path.display())]
    Missing { path: PathBuf },

    #[error("invalid configuration: {0}")]
    Invalid(#[from] Box<figment::Error>),

    #[error(
        "service.socket_group and service.http_socket_group must differ, both are \"{group}\""
    )]
    SharedSocketGroup { group: String },

    #[error("failed to render configuration as YAML: {0}")]
    Render(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Json => "json",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directives, e.g. `info` or `launchkit=debug,info`.
    /// `RUST_LOG` takes precedence when set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Job label written into generated plists.
    pub label: String,
    /// Socket group the echo service resolves.
    pub socket_group: String,
    /// Socket group the HTTP adapter resolves.
    pub http_socket_group: String,
    /// Port advertised for `socket_group` in generated plists.
    pub service_port: u16,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            label: "net.launchkit.echo".to_owned(),
            socket_group: "EchoSocket".to_owned(),
            http_socket_group: "HTTPSockets".to_owned(),
            service_port: 12345,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub service: ServiceConfig,
}

impl AppConfig {
    /// Load defaults, then `path` (if given), then the environment.
    ///
    /// # Errors
    /// - [`ConfigError::Missing`] if `path` is given but is not a file
    /// - [`ConfigError::Invalid`] if a source cannot be parsed or has unknown keys
    /// - [`ConfigError::SharedSocketGroup`] if the echo and HTTP groups coincide
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(path) = path {
            if !path.is_file() {
                return Err(ConfigError::Missing {
                    path: path.to_path_buf(),
                });
            }
            figment = figment.merge(Yaml::file(path));
        }

        let config: Self = figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)?;
        config.validate()?;

        if let Some(path) = path {
            tracing::debug!(path = %path.display(), "Loaded configuration file");
        }
        Ok(config)
    }

    /// Each inherited descriptor may be adopted once, so the echo and HTTP
    /// servers need distinct socket groups.
    ///
    /// # Errors
    /// Returns [`ConfigError::SharedSocketGroup`] if both groups have the same name.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let service = &self.service;
        if service.socket_group == service.http_socket_group {
            return Err(ConfigError::SharedSocketGroup {
                group: service.socket_group.clone(),
            });
        }
        Ok(())
    }

    /// Raise the log level for `-v` flags: one means `info`, two `debug`,
    /// three or more `trace`. Zero leaves the configured level alone.
    pub fn apply_verbosity(&mut self, verbose: u8) {
        let level = match verbose {
            0 => return,
            1 => "info",
            2 => "debug",
            _ => "trace",
        };
        level.clone_into(&mut self.logging.level);
    }

    /// # Errors
    /// Returns [`ConfigError::Render`] if serialization fails.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        serde_saphyr::to_string(self).map_err(|e| ConfigError::Render(e.to_string()))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use std::io::Write;

    fn yaml_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn defaults_without_file() {
        temp_env::with_vars_unset(
            [
                "LAUNCHKIT__SERVICE__SOCKET_GROUP",
                "LAUNCHKIT__SERVICE__HTTP_SOCKET_GROUP",
                "LAUNCHKIT__LOGGING__LEVEL",
            ],
            || {
                let config = AppConfig::load_or_default(None).unwrap();
                assert_eq!(config, AppConfig::default());
                assert_eq!(config.service.socket_group, "EchoSocket");
                assert_eq!(config.service.service_port, 12345);
            },
        );
    }

    #[test]
    fn file_overrides_defaults() {
        let file = yaml_file("service:\n  socket_group: Web\n  service_port: 8080\nlogging:\n  format: json\n");

        temp_env::with_var_unset("LAUNCHKIT__SERVICE__SOCKET_GROUP", || {
            let config = AppConfig::load_or_default(Some(file.path())).unwrap();
            assert_eq!(config.service.socket_group, "Web");
            assert_eq!(config.service.service_port, 8080);
            assert_eq!(config.service.label, "net.launchkit.echo");
            assert_eq!(config.logging.format, LogFormat::Json);
        });
    }

    #[test]
    fn environment_overrides_file() {
        let file = yaml_file("service:\n  socket_group: Web\n");

        temp_env::with_var("LAUNCHKIT__SERVICE__SOCKET_GROUP", Some("FromEnv"), || {
            let config = AppConfig::load_or_default(Some(file.path())).unwrap();
            assert_eq!(config.service.socket_group, "FromEnv");
        });
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.yaml");

        let err = AppConfig::load_or_default(Some(&path)).unwrap_err();

        assert!(matches!(err, ConfigError::Missing { .. }));
        assert!(err.to_string().contains("absent.yaml"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let file = yaml_file("service:\n  sockets: nope\n");

        let err = AppConfig::load_or_default(Some(file.path())).unwrap_err();

        assert!(matches!(err, ConfigError::Invalid(_)), "{err}");
    }

    #[test]
    fn shared_socket_group_is_rejected() {
        temp_env::with_vars(
            [
                ("LAUNCHKIT__SERVICE__SOCKET_GROUP", None),
                ("LAUNCHKIT__SERVICE__HTTP_SOCKET_GROUP", Some("EchoSocket")),
            ],
            || {
                let err = AppConfig::load_or_default(None).unwrap_err();

                assert!(
                    matches!(err, ConfigError::SharedSocketGroup { ref group } if group == "EchoSocket")
                );
                assert!(err.to_string().contains("must differ"), "{err}");
            },
        );
    }

    #[test]
    fn distinct_socket_groups_validate() {
        let mut config = AppConfig::default();
        assert!(config.validate().is_ok());

        config.service.http_socket_group = config.service.socket_group.clone();
        assert!(config.validate().is_err());
    }

    #[test]
    fn verbosity_raises_level() {
        let mut config = AppConfig::default();
        config.logging.level = "warn".to_owned();

        config.apply_verbosity(0);
        assert_eq!(config.logging.level, "warn");
        config.apply_verbosity(2);
        assert_eq!(config.logging.level, "debug");
        config.apply_verbosity(7);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn yaml_rendering_parses_back() {
        let mut config = AppConfig::default();
        config.service.socket_group = "Rendered".to_owned();

        let yaml = config.to_yaml().unwrap();
        let parsed: AppConfig = serde_saphyr::from_str(&yaml).unwrap();

        assert_eq!(parsed, config);
    }
}
