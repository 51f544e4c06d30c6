//! Configuration Loader
//!
//! Layers the runner configuration from defaults, an optional file, the
//! environment and command-line overrides, then validates the result.

use super::error::{ConfigResult, ConfigurationError};
use super::MpxConfig;
use crate::constants::ENV_PREFIX;
use config::{Config, Environment, File};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Values given explicitly on the command line; they win over every other source
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub parallelism: Option<usize>,
    pub nice: Option<i32>,
    pub mpxlist: Option<String>,
    pub ignlist: Option<String>,
    pub startup: Option<PathBuf>,
    pub csi: Option<String>,
    pub cso: Option<PathBuf>,
    pub cse: Option<PathBuf>,
    pub heartbeat_interval_ms: Option<u64>,
    pub forward_signals: Option<bool>,
}

pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration, reading `MPX_*` variables from the process environment
    pub fn load(file: Option<&Path>, overrides: &ConfigOverrides) -> ConfigResult<MpxConfig> {
        Self::load_with_environment(file, overrides, Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration with an explicit environment source
    /// This is useful for testing without modifying global environment variables
    pub fn load_with_environment(
        file: Option<&Path>,
        overrides: &ConfigOverrides,
        environment: Environment,
    ) -> ConfigResult<MpxConfig> {
        let mut builder = Config::builder().add_source(Config::try_from(&MpxConfig::default())?);

        if let Some(path) = file {
            if !path.is_file() {
                return Err(ConfigurationError::file_read_error(
                    path.display().to_string(),
                    "not a regular file",
                ));
            }
            debug!("Loading configuration file: {}", path.display());
            builder = builder.add_source(File::from(path).required(true));
        }

        let builder = builder
            .add_source(environment)
            .set_override_option("parallelism", overrides.parallelism.map(|v| v as u64))?
            .set_override_option("nice", overrides.nice.map(i64::from))?
            .set_override_option("mpxlist", overrides.mpxlist.clone())?
            .set_override_option("ignlist", overrides.ignlist.clone())?
            .set_override_option("startup", path_override(&overrides.startup))?
            .set_override_option("csi", overrides.csi.clone())?
            .set_override_option("cso", path_override(&overrides.cso))?
            .set_override_option("cse", path_override(&overrides.cse))?
            .set_override_option("heartbeat_interval_ms", overrides.heartbeat_interval_ms)?
            .set_override_option("forward_signals", overrides.forward_signals)?;

        let config: MpxConfig = builder.build()?.try_deserialize()?;
        config.validate()?;

        debug!(
            "Configuration loaded successfully: {}",
            serde_json::to_string_pretty(&Self::sanitize_config_for_logging(&config))
                .unwrap_or_else(|_| "[serialization error]".to_string())
        );

        Ok(config)
    }

    /// Render configuration for logs with the stdin payload masked
    ///
    /// `csi` may carry a literal connect string; only the `@file` indirection
    /// form is safe to print as is.
    pub fn sanitize_config_for_logging(config: &MpxConfig) -> serde_json::Value {
        let mut config_json = serde_json::json!(config);

        if let Some(csi) = config_json.get_mut("csi") {
            let masked = match csi.as_str() {
                Some("") => "[EMPTY]".to_string(),
                Some(s) if s.starts_with(crate::constants::CREDENTIAL_FILE_PREFIX) => s.to_string(),
                Some(_) => "[MASKED]".to_string(),
                None => "[MASKED]".to_string(),
            };
            *csi = serde_json::Value::String(masked);
        }

        config_json
    }
}

fn path_override(path: &Option<PathBuf>) -> Option<String> {
    path.as_ref().map(|p| p.to_string_lossy().into_owned())
}
