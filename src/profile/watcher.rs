use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, SystemTime},
};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::task::JoinHandle;

#[cfg(test)]
use mockall::automock;

use crate::{bundle::Bundle, error::PolicyError};

use super::{ProfileManager, ShutdownSignal};

/// Where provisioning bundles come from
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ProvisioningSource: Send + 'static {
    /// The latest bundle, or `None` when nothing changed since the last fetch
    async fn fetch(&mut self) -> Result<Option<Bundle>, PolicyError>;
}

/// Provisioning bundle stored in a TOML or JSON file
///
/// The file is re-read whenever its modification time changes.
#[derive(Debug)]
pub struct FileSource {
    path: PathBuf,
    last_modified: Option<SystemTime>,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_modified: None,
        }
    }

    /// A source that treats the file's current contents as already seen
    pub fn primed(path: impl Into<PathBuf>) -> Result<Self, PolicyError> {
        let mut source = Self::new(path);
        source.last_modified = Some(modified(&source.path)?);
        Ok(source)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn modified(path: &Path) -> Result<SystemTime, PolicyError> {
    Ok(fs::metadata(path)?.modified()?)
}

#[async_trait]
impl ProvisioningSource for FileSource {
    async fn fetch(&mut self) -> Result<Option<Bundle>, PolicyError> {
        let mtime = modified(&self.path)?;
        if self.last_modified == Some(mtime) {
            return Ok(None);
        }
        // a broken file is reported once, not on every poll
        self.last_modified = Some(mtime);

        debug!("reloading provisioning bundle from {}", self.path.display());
        Bundle::load(&self.path).map(Some)
    }
}

/// Wraps a source so its bundles sit between two fixed bundles
///
/// Keys from `above` win over the fetched bundle, which wins over `below`.
pub struct WithOverrides<S> {
    inner: S,
    below: Bundle,
    above: Bundle,
}

impl<S: ProvisioningSource> WithOverrides<S> {
    pub fn new(inner: S, below: Bundle, above: Bundle) -> Self {
        Self {
            inner,
            below,
            above,
        }
    }
}

#[async_trait]
impl<S: ProvisioningSource> ProvisioningSource for WithOverrides<S> {
    async fn fetch(&mut self) -> Result<Option<Bundle>, PolicyError> {
        let Some(fetched) = self.inner.fetch().await? else {
            return Ok(None);
        };
        let mut bundle = self.below.clone();
        bundle.put_all(&fetched);
        bundle.put_all(&self.above);
        Ok(Some(bundle))
    }
}

/// Poll `source` every `interval` and push new bundles into the provisioning
/// layer until `shutdown` fires
///
/// Fetch errors are logged and polling continues.
pub fn spawn_watcher<S: ProvisioningSource>(
    mut source: S,
    manager: Arc<ProfileManager>,
    shutdown: Arc<ShutdownSignal>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if shutdown.wait_timeout_or_shutdown(interval).await {
                debug!("provisioning watcher stopped");
                return;
            }

            match source.fetch().await {
                Ok(Some(bundle)) => {
                    if manager.set_mdm_restrictions(bundle) {
                        info!("applied new provisioning bundle");
                    }
                }
                Ok(None) => {}
                Err(err) => warn!("failed to refresh provisioning bundle: {err}"),
            }
        }
    })
}
