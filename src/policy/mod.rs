pub mod bookmarks;
pub mod defaults;
pub mod download;
pub mod flag;
pub mod model;
pub mod net;
pub mod search;
pub mod toggle;

use log::warn;
use serde::Serialize;

use crate::{bundle::Bundle, error::PolicyError};

pub use bookmarks::ManagedBookmarksRestriction;
pub use defaults::{HostConfig, HostDefaults};
pub use download::DownloadDirRestriction;
pub use flag::FlagRestriction;
pub use model::{PolicySnapshot, Restrictions};
pub use net::{ProxyRestriction, UrlFilterRestriction};
pub use search::SearchEngineRestriction;
pub use toggle::ToggleRestriction;

/// A policy set by a management agent on a browser running in a managed profile
///
/// Implementations read the keys they understand from the merged restriction
/// bundle and ignore everything else. `enforce` never fails: a missing or
/// malformed key falls back to the restriction's default and is listed in the
/// returned [`Enforcement`].
pub trait Restriction: Send {
    fn name(&self) -> &'static str;

    fn is_enabled(&self) -> bool;

    fn enforce(&mut self, restrictions: &Bundle) -> Enforcement;
}

/// Why a default was used for a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum FallbackReason {
    Missing,
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fallback {
    pub key: String,
    pub reason: FallbackReason,
}

/// Outcome of a single `enforce` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Enforcement {
    pub restriction: &'static str,
    pub enabled: bool,
    pub fallbacks: Vec<Fallback>,
}

impl Enforcement {
    /// Fallbacks caused by malformed input, as opposed to absent keys
    pub fn malformed(&self) -> impl Iterator<Item = &Fallback> {
        self.fallbacks
            .iter()
            .filter(|f| matches!(f.reason, FallbackReason::Malformed(_)))
    }
}

/// Bundle accessor that records every default it hands out
pub(crate) struct BundleReader<'a> {
    restriction: &'static str,
    bundle: &'a Bundle,
    fallbacks: Vec<Fallback>,
}

impl<'a> BundleReader<'a> {
    pub(crate) fn new(restriction: &'static str, bundle: &'a Bundle) -> Self {
        Self {
            restriction,
            bundle,
            fallbacks: Vec::new(),
        }
    }

    pub(crate) fn contains(&self, key: &str) -> bool {
        self.bundle.contains_key(key)
    }

    /// Boolean value, or `None` when absent or malformed (malformed is recorded)
    pub(crate) fn bool(&mut self, key: &str) -> Option<bool> {
        let lookup = self.bundle.get_bool(key);
        self.settle(key, lookup)
    }

    pub(crate) fn bool_or(&mut self, key: &str, default: bool) -> bool {
        match self.bool(key) {
            Some(value) => value,
            None => {
                self.missing(key);
                default
            }
        }
    }

    /// String value, or `None` when absent or malformed (malformed is recorded)
    pub(crate) fn string(&mut self, key: &str) -> Option<String> {
        let lookup = self
            .bundle
            .get_string(key)
            .map(|value| value.map(str::to_string));
        self.settle(key, lookup)
    }

    pub(crate) fn string_or(&mut self, key: &str, default: &str) -> String {
        match self.string(key) {
            Some(value) => value,
            None => {
                self.missing(key);
                default.to_string()
            }
        }
    }

    /// Record a key whose value was present but unusable
    pub(crate) fn reject(&mut self, key: &str, detail: impl Into<String>) {
        let detail = detail.into();
        warn!(
            "{}: ignoring malformed value for {key}: {detail}",
            self.restriction
        );
        self.fallbacks.push(Fallback {
            key: key.to_string(),
            reason: FallbackReason::Malformed(detail),
        });
    }

    pub(crate) fn finish(self, enabled: bool) -> Enforcement {
        Enforcement {
            restriction: self.restriction,
            enabled,
            fallbacks: self.fallbacks,
        }
    }

    fn missing(&mut self, key: &str) {
        // a malformed key was already recorded by `settle`
        if self.bundle.contains_key(key) {
            return;
        }
        self.fallbacks.push(Fallback {
            key: key.to_string(),
            reason: FallbackReason::Missing,
        });
    }

    fn settle<T>(&mut self, key: &str, lookup: Result<Option<T>, PolicyError>) -> Option<T> {
        match lookup {
            Ok(value) => value,
            Err(err) => {
                self.reject(key, err.to_string());
                None
            }
        }
    }
}
