use std::sync::{Arc, Mutex, OnceLock};

use log::{debug, info};

use crate::bundle::Bundle;

use super::{BundleReader, Enforcement, HostConfig, HostDefaults, Restriction};

pub const RESTRICTION_ENABLED: &str = "DownloadRestrictionEnabled";
pub const DOWNLOADS_ALLOWED: &str = "DownloadsAllowed";
pub const DOWNLOAD_DIR: &str = "DownloadDirectory";

pub const DEFAULT_DOWNLOADS_ALLOWED: bool = true;

static INSTANCE: OnceLock<Mutex<DownloadDirRestriction>> = OnceLock::new();

/// Whether downloads are allowed and where they are saved
///
/// While disabled the state mirrors the host defaults; while enabled it
/// mirrors the bundle, with host defaults for absent keys.
pub struct DownloadDirRestriction {
    enabled: bool,
    downloads_allowed: bool,
    download_dir: String,
    defaults: Arc<dyn HostDefaults>,
}

impl DownloadDirRestriction {
    pub fn new(defaults: Arc<dyn HostDefaults>) -> Self {
        let download_dir = defaults.download_dir();
        Self {
            enabled: false,
            downloads_allowed: DEFAULT_DOWNLOADS_ALLOWED,
            download_dir,
            defaults,
        }
    }

    /// Process-wide instance backed by [`HostConfig::from_env`]
    ///
    /// Constructed on first call; concurrent first calls still construct it
    /// only once. Prefer an explicitly owned instance (see
    /// [`Restrictions`](super::Restrictions)) where one can be threaded through.
    pub fn get_instance() -> &'static Mutex<DownloadDirRestriction> {
        INSTANCE.get_or_init(|| {
            info!("[{}] creating process-wide instance", Self::NAME);
            Mutex::new(Self::new(Arc::new(HostConfig::from_env())))
        })
    }

    pub fn downloads_allowed(&self) -> bool {
        self.downloads_allowed
    }

    pub fn download_directory(&self) -> &str {
        &self.download_dir
    }

    const NAME: &'static str = "DownloadDirRestriction";

    fn reset(&mut self) {
        self.downloads_allowed = DEFAULT_DOWNLOADS_ALLOWED;
        self.download_dir = self.defaults.download_dir();
    }
}

impl Restriction for DownloadDirRestriction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enforce(&mut self, restrictions: &Bundle) -> Enforcement {
        let mut reader = BundleReader::new(Self::NAME, restrictions);
        self.enabled = reader.bool_or(RESTRICTION_ENABLED, false);

        if self.enabled {
            let default_dir = self.defaults.download_dir();
            self.downloads_allowed = reader.bool_or(DOWNLOADS_ALLOWED, DEFAULT_DOWNLOADS_ALLOWED);
            self.download_dir = reader.string_or(DOWNLOAD_DIR, &default_dir);
        } else {
            self.reset();
        }

        debug!(
            "[{}] enabled={} allowed={} dir={}",
            Self::NAME,
            self.enabled,
            self.downloads_allowed,
            self.download_dir
        );
        reader.finish(self.enabled)
    }
}
