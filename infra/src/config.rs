//! Configuration loading
//!
//! Sources are layered lowest to highest:
//! 1. Built-in [`DispatchConfig`] defaults for the detected environment
//! 2. A TOML file, either the given path or the environment's
//!    `sms.<environment>.toml` when it exists
//! 3. `SMS__*` environment variables, `__` separating nested keys
//!    (`SMS__CACHE__URL`, `SMS__PROVIDERS__BACKUPS=a,b`)
//!
//! A `.env` file in the working directory is loaded first.

use ::config::{Config, Environment as EnvSource, File, FileFormat};
use std::path::Path;
use tracing::{debug, info};

use smsflow_shared::{DispatchConfig, Environment, LoggingConfig};

use crate::InfrastructureError;

/// Prefix of environment variables read by [`load_config`]
pub const ENV_PREFIX: &str = "SMS";

/// Load and validate the dispatcher configuration
pub fn load_config(path: Option<&Path>) -> Result<DispatchConfig, InfrastructureError> {
    dotenvy::dotenv().ok();
    let environment = Environment::from_env();

    let file = match path {
        Some(path) => File::from(path).format(FileFormat::Toml).required(true),
        None => File::with_name(&environment.config_file())
            .format(FileFormat::Toml)
            .required(false),
    };

    let config = build(environment, file, Some(env_source()))?;
    info!(
        environment = %config.environment,
        primary = %config.providers.primary,
        backups = config.providers.backups.len(),
        "dispatch configuration loaded"
    );
    Ok(config)
}

/// Parse a configuration from TOML text layered over the defaults
pub fn from_toml_str(toml: &str) -> Result<DispatchConfig, InfrastructureError> {
    build(Environment::default(), File::from_str(toml, FileFormat::Toml), None)
}

fn env_source() -> EnvSource {
    EnvSource::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
        .list_separator(",")
        .with_list_parse_key("providers.backups")
}

fn build<F>(environment: Environment, file: F, env: Option<EnvSource>) -> Result<DispatchConfig, InfrastructureError>
where
    F: ::config::Source + Send + Sync + 'static,
{
    let defaults = DispatchConfig {
        environment,
        logging: LoggingConfig::for_environment(environment),
        ..DispatchConfig::default()
    };

    let mut builder = Config::builder()
        .add_source(Config::try_from(&defaults)?)
        .add_source(file);
    if let Some(env) = env {
        builder = builder.add_source(env);
    }

    let config: DispatchConfig = builder.build()?.try_deserialize()?;
    config.validate()?;
    debug!(?config, "configuration validated");
    Ok(config)
}
