use log::{debug, info};
use serde::Serialize;

use crate::{
    bundle::Bundle,
    net::{
        ProxyMode, ProxyServer, UrlFilterSet, parse_bypass_list, parse_filter_list,
        parse_proxy_server,
    },
};

use super::{BundleReader, Enforcement, Restriction};

pub const URL_BLACK_LIST: &str = "URLBlackList";
pub const URL_WHITE_LIST: &str = "URLWhiteList";

pub const PROXY_MODE: &str = "ProxyMode";
pub const PROXY_SERVER: &str = "ProxyServer";
pub const PROXY_PAC_URL: &str = "ProxyPacUrl";
pub const PROXY_BYPASS_LIST: &str = "ProxyBypassList";

/// URL black list with white list exceptions
#[derive(Debug, Clone, Default)]
pub struct UrlFilterRestriction {
    filters: UrlFilterSet,
}

impl UrlFilterRestriction {
    const NAME: &'static str = "URLFilterRestriction";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn filters(&self) -> &UrlFilterSet {
        &self.filters
    }

    pub fn is_blocked(&self, url: &str) -> bool {
        self.filters.is_blocked(url)
    }
}

impl Restriction for UrlFilterRestriction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_enabled(&self) -> bool {
        !self.filters.is_empty()
    }

    fn enforce(&mut self, restrictions: &Bundle) -> Enforcement {
        let mut reader = BundleReader::new(Self::NAME, restrictions);
        let mut read_list = |key: &str| {
            let (filters, errors) = parse_filter_list(&reader.string(key).unwrap_or_default());
            for err in errors {
                reader.reject(key, err.to_string());
            }
            filters
        };

        let blacklist = read_list(URL_BLACK_LIST);
        let whitelist = read_list(URL_WHITE_LIST);
        self.filters = UrlFilterSet {
            blacklist,
            whitelist,
        };

        debug!(
            "[{}] {} blocked, {} allowed",
            Self::NAME,
            self.filters.blacklist.len(),
            self.filters.whitelist.len()
        );
        reader.finish(self.is_enabled())
    }
}

/// Proxy configuration handed to the network stack
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct ProxyConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server: Option<ProxyServer>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pac_url: Option<String>,
    pub bypass: Vec<String>,
}

/// Managed proxy settings
///
/// Leaving `ProxyMode` unset lifts the restriction so the user can pick their
/// own proxy. A mode whose required companion key is missing or invalid also
/// lifts it, and so does an unrecognised mode: the previous proxy is never
/// left in force.
#[derive(Debug, Clone, Default)]
pub struct ProxyRestriction {
    mode: Option<ProxyMode>,
    config: Option<ProxyConfig>,
}

impl ProxyRestriction {
    const NAME: &'static str = "ProxyRestriction";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn mode(&self) -> Option<ProxyMode> {
        self.mode
    }

    /// Server, PAC script and bypass settings; `None` for modes that carry none
    pub fn config(&self) -> Option<&ProxyConfig> {
        self.config.as_ref()
    }

    /// Bypass list in `http.nonProxyHosts` form (`a|b|c`)
    pub fn non_proxy_hosts(&self) -> String {
        self.config
            .as_ref()
            .map(|cfg| cfg.bypass.join("|"))
            .unwrap_or_default()
    }

    fn save(&mut self, mode: Option<ProxyMode>, config: Option<ProxyConfig>) {
        match mode {
            Some(mode) => info!("[{}] managed proxy mode {mode}", Self::NAME),
            None if self.mode.is_some() => info!("[{}] managed proxy lifted", Self::NAME),
            None => {}
        }
        self.mode = mode;
        // an all-empty config carries no information
        self.config = config.filter(|cfg| {
            cfg.server.is_some() || cfg.pac_url.is_some() || !cfg.bypass.is_empty()
        });
    }
}

impl Restriction for ProxyRestriction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_enabled(&self) -> bool {
        self.mode.is_some()
    }

    fn enforce(&mut self, restrictions: &Bundle) -> Enforcement {
        let mut reader = BundleReader::new(Self::NAME, restrictions);

        let mode = match reader.string(PROXY_MODE) {
            None => None,
            Some(raw) => match raw.parse::<ProxyMode>() {
                Ok(mode) => Some(mode),
                Err(reason) => {
                    reader.reject(PROXY_MODE, reason);
                    None
                }
            },
        };

        match mode {
            None => self.save(None, None),
            Some(mode @ (ProxyMode::Direct | ProxyMode::System | ProxyMode::AutoDetect)) => {
                self.save(Some(mode), None)
            }
            Some(ProxyMode::FixedServers) => {
                let server = match reader.string(PROXY_SERVER) {
                    Some(raw) => match parse_proxy_server(&raw) {
                        Ok(server) => Some(server),
                        Err(reason) => {
                            reader.reject(PROXY_SERVER, reason);
                            None
                        }
                    },
                    None => {
                        reader.reject(PROXY_SERVER, "required by fixed_servers mode");
                        None
                    }
                };

                match server {
                    Some(server) => {
                        let bypass = reader
                            .string(PROXY_BYPASS_LIST)
                            .map(|list| parse_bypass_list(&list))
                            .unwrap_or_default();
                        debug!(
                            "[{}] fixed server {}:{:?}, bypass {:?}",
                            Self::NAME,
                            server.host,
                            server.port,
                            bypass
                        );
                        self.save(
                            Some(ProxyMode::FixedServers),
                            Some(ProxyConfig {
                                server: Some(server),
                                pac_url: None,
                                bypass,
                            }),
                        );
                    }
                    None => self.save(None, None),
                }
            }
            Some(ProxyMode::PacScript) => match reader.string(PROXY_PAC_URL) {
                Some(pac_url) if !pac_url.trim().is_empty() => self.save(
                    Some(ProxyMode::PacScript),
                    Some(ProxyConfig {
                        server: None,
                        pac_url: Some(pac_url.trim().to_string()),
                        bypass: Vec::new(),
                    }),
                ),
                _ => {
                    reader.reject(PROXY_PAC_URL, "required by pac_script mode");
                    self.save(None, None)
                }
            },
        }

        reader.finish(self.is_enabled())
    }
}
