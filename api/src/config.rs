use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use config::{Environment, File, FileFormat};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "person-app.toml";
const CONFIG_PATH_VAR: &str = "PERSON_APP_CONFIG";
const ENV_PREFIX: &str = "PERSON_APP";

#[derive(Clone, Debug, serde::Deserialize)]
pub struct Config {
    pub server_address: String,
    /// Postgres url. Without one the people live in memory.
    #[serde(default)]
    pub database_url: Option<String>,
    pub database_pool_size: u32,
    pub max_connections: usize,
    pub request_timeout_secs: u64,
}

impl Config {
    /// Defaults, then the optional TOML file, then `PERSON_APP_*` variables.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var_os(CONFIG_PATH_VAR)
            .map(PathBuf::from)
            .unwrap_or_else(|| CONFIG_FILE.into());

        Self::load_from(&path, ENV_PREFIX)
    }

    pub fn load_from(path: &Path, env_prefix: &str) -> Result<Self, ConfigError> {
        let mut config: Self = ::config::Config::builder()
            .set_default("server_address", "0.0.0.0:9000")?
            .set_default("database_pool_size", 10)?
            .set_default("max_connections", 1_000)?
            .set_default("request_timeout_secs", 15)?
            .add_source(File::new(&path.to_string_lossy(), FileFormat::Toml).required(false))
            .add_source(Environment::with_prefix(env_prefix))
            .build()?
            .try_deserialize()?;

        config.database_url = config.database_url.filter(|url| !url.trim().is_empty());
        config.validate()?;

        Ok(config)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "max_connections must be greater than zero".into(),
            ));
        }
        if self.database_pool_size == 0 {
            return Err(ConfigError::Invalid(
                "database_pool_size must be greater than zero".into(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_secs must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}
