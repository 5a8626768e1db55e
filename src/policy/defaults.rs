use std::env;

#[cfg(test)]
use mockall::automock;

/// Download directory used when neither the host nor the environment names one
pub const DEFAULT_DOWNLOAD_DIR: &str = "/storage/emulated/0/Download";

/// Search engine used when the host configuration names none
pub const DEFAULT_SEARCH_ENGINE: &str = "google";

/// Environment variable overriding the default download directory
pub const DOWNLOAD_DIR_ENV: &str = "MDM_DEFAULT_DOWNLOAD_DIR";

/// Host application values that restrictions fall back to
#[cfg_attr(test, automock)]
pub trait HostDefaults: Send + Sync + 'static {
    /// Default download directory, read again each time a restriction resets
    fn download_dir(&self) -> String;

    fn search_engine(&self) -> String;

    /// Whether `name` refers to a search engine the browser ships with
    fn is_known_search_engine(&self, name: &str) -> bool;
}

/// Host defaults backed by plain values (usually the `[defaults]` config table)
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub download_dir: String,
    pub search_engine: String,
    pub search_engines: Vec<String>,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            download_dir: DEFAULT_DOWNLOAD_DIR.to_string(),
            search_engine: DEFAULT_SEARCH_ENGINE.to_string(),
            search_engines: ["google", "bing", "yahoo", "duckduckgo", "baidu", "yandex"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl HostConfig {
    /// Defaults with the download directory taken from the environment when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = env::var(DOWNLOAD_DIR_ENV)
            && !dir.trim().is_empty()
        {
            config.download_dir = dir;
        }
        config
    }
}

impl HostDefaults for HostConfig {
    fn download_dir(&self) -> String {
        self.download_dir.clone()
    }

    fn search_engine(&self) -> String {
        self.search_engine.clone()
    }

    fn is_known_search_engine(&self, name: &str) -> bool {
        self.search_engines
            .iter()
            .any(|engine| engine.eq_ignore_ascii_case(name))
    }
}
