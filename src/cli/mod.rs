pub mod args;
pub mod config;
pub mod loader;

pub use args::{Args, Format};
pub use config::{ConfigFile, DefaultsConfig};
pub use loader::{LoadedPolicy, PolicyLoader};
