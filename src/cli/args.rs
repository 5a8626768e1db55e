use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Output format for the evaluated policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Format {
    #[default]
    Toml,
    Json,
}

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Evaluate layered MDM restriction bundles into managed browser policy"
)]
pub struct Args {
    /// Path to configuration file (TOML)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Provisioning bundle pushed by the MDM agent (TOML, or JSON with a .json extension)
    #[arg(long = "provisioning", value_name = "PATH")]
    pub provisioning: Option<PathBuf>,

    /// Set a provisioning restriction, overriding the config and provisioning file
    #[arg(long = "set", value_name = "KEY=VALUE")]
    pub set: Vec<String>,

    /// Host default download directory
    #[arg(long = "default-download-dir", value_name = "DIR")]
    pub default_download_dir: Option<String>,

    /// Report whether the URL is blocked by the URL filters
    #[arg(long = "check-url", value_name = "URL")]
    pub check_url: Vec<String>,

    /// Output format
    #[arg(long = "format", value_enum, default_value_t = Format::Toml)]
    pub format: Format,

    /// Keep running and re-evaluate whenever the provisioning file changes
    #[arg(long = "watch", requires = "provisioning")]
    pub watch: bool,

    /// Poll interval for --watch, in seconds
    #[arg(long = "interval", value_name = "SECS", default_value_t = 2)]
    pub interval: u64,
}
