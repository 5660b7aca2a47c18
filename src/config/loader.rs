//! Configuration loading from disk, environment and command line.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::cli::CliArgs;
use crate::config::schema::ScalerConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file without validating it.
pub fn read_config_file(path: &Path) -> Result<ScalerConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(toml::from_str(&content)?)
}

/// Resolve the effective configuration from the process environment.
pub fn resolve(args: &CliArgs) -> Result<ScalerConfig, ConfigError> {
    resolve_with(args, |name| std::env::var(name).ok())
}

/// Resolve the effective configuration: defaults, then the optional file,
/// then environment and flags (clap has already merged those two). Legacy
/// `BUILDKITD_*` variables, read through `lookup`, fill whatever the flags
/// and current variables left unset.
pub fn resolve_with<F>(args: &CliArgs, lookup: F) -> Result<ScalerConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut args = args.clone();
    args.fill_legacy_env(lookup)
        .map_err(|e| ConfigError::Validation(vec![e]))?;

    let mut config = match &args.config {
        Some(path) => read_config_file(path)?,
        None => ScalerConfig::default(),
    };
    args.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
