// Composition root tying every restriction to one set of host defaults
use std::sync::Arc;

use serde::Serialize;

use crate::{bundle::Bundle, net::ProxyMode};

use super::{
    DownloadDirRestriction, Enforcement, FlagRestriction, HostDefaults,
    ManagedBookmarksRestriction, ProxyRestriction, Restriction, SearchEngineRestriction,
    ToggleRestriction, UrlFilterRestriction,
};

/// Every restriction the browser understands, owned together
pub struct Restrictions {
    pub download: DownloadDirRestriction,
    pub incognito: FlagRestriction,
    pub dev_tools: FlagRestriction,
    pub edit_bookmarks: FlagRestriction,
    pub autofill: ToggleRestriction,
    pub do_not_track: ToggleRestriction,
    pub third_party_cookies: ToggleRestriction,
    pub search: SearchEngineRestriction,
    pub url_filter: UrlFilterRestriction,
    pub proxy: ProxyRestriction,
    pub bookmarks: ManagedBookmarksRestriction,
}

impl Restrictions {
    pub fn new(defaults: Arc<dyn HostDefaults>) -> Self {
        Self {
            download: DownloadDirRestriction::new(Arc::clone(&defaults)),
            incognito: FlagRestriction::incognito(),
            dev_tools: FlagRestriction::dev_tools(),
            edit_bookmarks: FlagRestriction::edit_bookmarks(),
            autofill: ToggleRestriction::autofill(),
            do_not_track: ToggleRestriction::do_not_track(),
            third_party_cookies: ToggleRestriction::third_party_cookies(),
            search: SearchEngineRestriction::new(defaults),
            url_filter: UrlFilterRestriction::new(),
            proxy: ProxyRestriction::new(),
            bookmarks: ManagedBookmarksRestriction::new(),
        }
    }

    /// Apply `bundle` to every restriction, in declaration order
    pub fn enforce(&mut self, bundle: &Bundle) -> Vec<Enforcement> {
        self.all_mut()
            .into_iter()
            .map(|restriction| restriction.enforce(bundle))
            .collect()
    }

    fn all_mut(&mut self) -> [&mut dyn Restriction; 11] {
        [
            &mut self.download,
            &mut self.incognito,
            &mut self.dev_tools,
            &mut self.edit_bookmarks,
            &mut self.autofill,
            &mut self.do_not_track,
            &mut self.third_party_cookies,
            &mut self.search,
            &mut self.url_filter,
            &mut self.proxy,
            &mut self.bookmarks,
        ]
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        let proxy_config = self.proxy.config();
        PolicySnapshot {
            download: DownloadSnapshot {
                enabled: self.download.is_enabled(),
                downloads_allowed: self.download.downloads_allowed(),
                download_dir: self.download.download_directory().to_string(),
            },
            incognito: FlagSnapshot::from(&self.incognito),
            dev_tools: FlagSnapshot::from(&self.dev_tools),
            edit_bookmarks: FlagSnapshot::from(&self.edit_bookmarks),
            autofill: ToggleSnapshot::from(&self.autofill),
            do_not_track: ToggleSnapshot::from(&self.do_not_track),
            third_party_cookies: ToggleSnapshot::from(&self.third_party_cookies),
            search: SearchSnapshot {
                enabled: self.search.is_enabled(),
                search_engine: self.search.effective_search_engine(),
            },
            url_filter: UrlFilterSnapshot {
                enabled: self.url_filter.is_enabled(),
                blacklist: filter_strings(&self.url_filter.filters().blacklist),
                whitelist: filter_strings(&self.url_filter.filters().whitelist),
            },
            proxy: ProxySnapshot {
                enabled: self.proxy.is_enabled(),
                mode: self.proxy.mode(),
                server: proxy_config
                    .and_then(|cfg| cfg.server.as_ref())
                    .map(|server| match server.port {
                        Some(port) => format!("{}:{port}", server.host),
                        None => server.host.clone(),
                    }),
                pac_url: proxy_config.and_then(|cfg| cfg.pac_url.clone()),
                bypass: proxy_config.map(|cfg| cfg.bypass.clone()).unwrap_or_default(),
            },
            bookmarks: BookmarksSnapshot {
                enabled: self.bookmarks.is_enabled(),
                bookmarks: self.bookmarks.bookmark_count(),
                created: self.bookmarks.bookmarks_were_created(),
            },
        }
    }
}

fn filter_strings(filters: &[crate::net::UrlFilter]) -> Vec<String> {
    filters.iter().map(|f| f.as_str().to_string()).collect()
}

/// Serializable view of every restriction's current state
///
/// Only nested tables at the top level so the view renders as TOML.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PolicySnapshot {
    pub download: DownloadSnapshot,
    pub incognito: FlagSnapshot,
    pub dev_tools: FlagSnapshot,
    pub edit_bookmarks: FlagSnapshot,
    pub autofill: ToggleSnapshot,
    pub do_not_track: ToggleSnapshot,
    pub third_party_cookies: ToggleSnapshot,
    pub search: SearchSnapshot,
    pub url_filter: UrlFilterSnapshot,
    pub proxy: ProxySnapshot,
    pub bookmarks: BookmarksSnapshot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadSnapshot {
    pub enabled: bool,
    pub downloads_allowed: bool,
    pub download_dir: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlagSnapshot {
    pub enabled: bool,
    pub feature_allowed: bool,
}

impl From<&FlagRestriction> for FlagSnapshot {
    fn from(r: &FlagRestriction) -> Self {
        Self {
            enabled: r.is_enabled(),
            feature_allowed: r.feature_allowed(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToggleSnapshot {
    pub enabled: bool,
    pub value: bool,
}

impl From<&ToggleRestriction> for ToggleSnapshot {
    fn from(r: &ToggleRestriction) -> Self {
        Self {
            enabled: r.is_enabled(),
            value: r.value(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchSnapshot {
    pub enabled: bool,
    pub search_engine: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlFilterSnapshot {
    pub enabled: bool,
    pub blacklist: Vec<String>,
    pub whitelist: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxySnapshot {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<ProxyMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pac_url: Option<String>,
    pub bypass: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarksSnapshot {
    pub enabled: bool,
    pub bookmarks: usize,
    pub created: bool,
}
