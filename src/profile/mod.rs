pub mod sync;
pub mod watcher;

use std::{
    collections::BTreeMap,
    fmt,
    sync::{Mutex, PoisonError},
};

use log::{debug, info};
use tokio::sync::watch;

use crate::bundle::Bundle;

pub use sync::ShutdownSignal;
pub use watcher::{FileSource, ProvisioningSource, WithOverrides, spawn_watcher};

/// Source of a restriction bundle, in increasing precedence
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    /// Device-wide policy installed by the device administrator
    DeviceAdministrator,
    /// Restrictions set on the user profile
    User,
    /// Restrictions pushed by the MDM provisioning agent
    Provisioning,
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Layer::DeviceAdministrator => "device_admin",
            Layer::User => "user",
            Layer::Provisioning => "provisioning",
        })
    }
}

/// Holds the per-layer bundles of a managed profile and publishes their merge
///
/// Later layers override earlier ones key by key. Subscribers are only woken
/// when the merged bundle actually changes.
pub struct ProfileManager {
    layers: Mutex<BTreeMap<Layer, Bundle>>,
    merged: watch::Sender<Bundle>,
}

impl ProfileManager {
    pub fn new(layers: impl IntoIterator<Item = (Layer, Bundle)>) -> Self {
        let layers: BTreeMap<Layer, Bundle> = layers.into_iter().collect();
        let (merged, _) = watch::channel(merge(&layers));
        Self {
            layers: Mutex::new(layers),
            merged,
        }
    }

    /// Replace one layer; returns whether the merged bundle changed
    pub fn set_layer(&self, layer: Layer, bundle: Bundle) -> bool {
        let merged = {
            let mut layers = self.layers.lock().unwrap_or_else(PoisonError::into_inner);
            layers.insert(layer, bundle);
            merge(&layers)
        };

        let changed = self.merged.send_if_modified(|current| {
            if *current == merged {
                return false;
            }
            *current = merged;
            true
        });

        if changed {
            info!("{layer} restrictions updated");
        } else {
            debug!("{layer} restrictions unchanged");
        }
        changed
    }

    /// Replace the provisioning layer
    pub fn set_mdm_restrictions(&self, bundle: Bundle) -> bool {
        self.set_layer(Layer::Provisioning, bundle)
    }

    pub fn layer(&self, layer: Layer) -> Option<Bundle> {
        self.layers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&layer)
            .cloned()
    }

    pub fn merged(&self) -> Bundle {
        self.merged.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Bundle> {
        self.merged.subscribe()
    }
}

fn merge(layers: &BTreeMap<Layer, Bundle>) -> Bundle {
    let mut merged = Bundle::new();
    // BTreeMap iterates in precedence order
    for bundle in layers.values() {
        merged.put_all(bundle);
    }
    merged
}
