use log::debug;

use crate::{
    bundle::{Bundle, parse_overrides},
    error::PolicyError,
    policy::HostConfig,
    profile::Layer,
};

use super::args::Args;
use super::config::ConfigFile;

/// Everything the CLI read before evaluation
#[derive(Debug)]
pub struct LoadedPolicy {
    pub host: HostConfig,
    pub layers: Vec<(Layer, Bundle)>,
    /// Config `[provisioning]` table, the layer below the provisioning file
    pub provisioning_base: Bundle,
    /// `--set` entries, the layer above the provisioning file
    pub overrides: Bundle,
}

/// Load and merge restriction layers from command line arguments and config file
pub struct PolicyLoader;

impl PolicyLoader {
    /// Load every layer from CLI arguments
    ///
    /// Host defaults come from the environment, then the config `[defaults]`
    /// table, then `--default-download-dir`. The provisioning layer stacks the
    /// config `[provisioning]` table, the `--provisioning` file and `--set`.
    pub fn load(args: &Args) -> Result<LoadedPolicy, PolicyError> {
        let mut host = HostConfig::from_env();
        let config = match args.config.as_ref() {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };
        config.defaults.apply(&mut host);
        if let Some(dir) = &args.default_download_dir {
            host.download_dir = dir.clone();
        }

        let overrides = parse_overrides(&args.set)?;

        let mut provisioning = config.provisioning.clone();
        if let Some(path) = args.provisioning.as_ref() {
            debug!("loading provisioning bundle from {}", path.display());
            provisioning.put_all(&Bundle::load(path)?);
        }
        provisioning.put_all(&overrides);

        Ok(LoadedPolicy {
            host,
            layers: vec![
                (Layer::DeviceAdministrator, config.device_admin),
                (Layer::User, config.user),
                (Layer::Provisioning, provisioning),
            ],
            provisioning_base: config.provisioning,
            overrides,
        })
    }
}
