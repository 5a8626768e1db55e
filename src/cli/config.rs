use std::{
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::{bundle::Bundle, error::PolicyError, policy::HostConfig};

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct ConfigFile {
    #[serde(default)]
    pub defaults: DefaultsConfig,
    /// Device-wide restrictions
    #[serde(default)]
    pub device_admin: Bundle,
    /// Restrictions set on the user profile
    #[serde(default)]
    pub user: Bundle,
    /// Baseline provisioning restrictions, below the provisioning file and `--set`
    #[serde(default)]
    pub provisioning: Bundle,
}

/// Host application defaults; unset fields keep the built-in values
#[derive(Debug, Deserialize, Serialize, Default)]
pub struct DefaultsConfig {
    pub download_dir: Option<String>,
    pub search_engine: Option<String>,
    /// Search engines the browser ships with
    pub search_engines: Option<Vec<String>>,
}

impl DefaultsConfig {
    /// Apply the configured values on top of `host`
    pub fn apply(&self, host: &mut HostConfig) {
        if let Some(dir) = &self.download_dir {
            host.download_dir = dir.clone();
        }
        if let Some(engine) = &self.search_engine {
            host.search_engine = engine.clone();
        }
        if let Some(engines) = &self.search_engines {
            host.search_engines = engines.clone();
        }
    }
}

impl ConfigFile {
    /// Load configuration file
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path)?;
        toml::from_str(&content).map_err(|source| PolicyError::ConfigParse {
            path: PathBuf::from(path),
            source,
        })
    }
}
