use std::sync::Arc;

use log::{debug, info};

use crate::bundle::Bundle;

use super::{BundleReader, Enforcement, HostDefaults, Restriction};

pub const DEFAULT_SEARCH_PROVIDER_ENABLED: &str = "DefaultSearchProviderEnabled";
pub const SEARCH_PROVIDER_NAME: &str = "SearchProviderName";

/// Pins the default search engine
///
/// Only engines the host knows about can be pinned; an unknown name leaves the
/// restriction off. Lifting the restriction reverts to the host default.
pub struct SearchEngineRestriction {
    enabled: bool,
    engine: Option<String>,
    defaults: Arc<dyn HostDefaults>,
}

impl SearchEngineRestriction {
    const NAME: &'static str = "SearchEngineRestriction";

    pub fn new(defaults: Arc<dyn HostDefaults>) -> Self {
        Self {
            enabled: false,
            engine: None,
            defaults,
        }
    }

    /// The managed engine, if any
    pub fn search_engine(&self) -> Option<&str> {
        self.engine.as_deref()
    }

    /// The engine the browser should use when the user has not chosen one
    pub fn effective_search_engine(&self) -> String {
        match &self.engine {
            Some(engine) => engine.clone(),
            None => self.defaults.search_engine(),
        }
    }
}

impl Restriction for SearchEngineRestriction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enforce(&mut self, restrictions: &Bundle) -> Enforcement {
        let mut reader = BundleReader::new(Self::NAME, restrictions);
        let requested = reader.bool_or(DEFAULT_SEARCH_PROVIDER_ENABLED, false);
        let name = reader.string(SEARCH_PROVIDER_NAME);

        let known = match name {
            Some(name) if self.defaults.is_known_search_engine(&name) => Some(name),
            Some(name) => {
                if requested {
                    reader.reject(SEARCH_PROVIDER_NAME, format!("unknown search engine '{name}'"));
                }
                None
            }
            None => None,
        };

        match (requested, known) {
            (true, Some(engine)) => {
                debug!("[{}] pinning search engine {engine}", Self::NAME);
                self.engine = Some(engine);
                self.enabled = true;
            }
            _ if self.enabled => {
                info!(
                    "[{}] lifted, reverting to {}",
                    Self::NAME,
                    self.defaults.search_engine()
                );
                self.engine = None;
                self.enabled = false;
            }
            _ => {}
        }

        reader.finish(self.enabled)
    }
}
