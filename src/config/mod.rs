//! Configuration for the topology mirror.
//!
//! Loaded from an optional TOML file plus environment variables with the
//! `FLEET` prefix (highest priority); every field has a hardcoded default so
//! a bare `Settings::default()` is a working configuration.

mod sync;
pub use sync::*;


use std::env;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Snapshot reload and leader-discovery timing
    #[serde(default)]
    pub sync: SyncConfig,
}

impl Settings {
    /// Load configuration with priority:
    /// 1. Hardcoded defaults
    /// 2. Optional config file (`config_path` argument or `CONFIG_PATH` env)
    /// 3. Environment variables with the `FLEET__` prefix
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut config = Config::builder();

        if let Some(path) = config_path {
            config = config.add_source(File::with_name(path).required(true));
        } else if let Ok(path) = env::var("CONFIG_PATH") {
            config = config.add_source(File::with_name(&path).required(true));
        }

        config = config.add_source(
            Environment::with_prefix("FLEET")
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let settings: Settings = config.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        self.sync.validate()
    }
}
