use std::{fmt, str::FromStr};

use serde::Serialize;
use url::Url;

/// How the browser should pick its proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProxyMode {
    /// Never use a proxy
    Direct,
    /// Use the system proxy settings
    System,
    AutoDetect,
    /// Use the server named by `ProxyServer`
    FixedServers,
    /// Use the script named by `ProxyPacUrl`
    PacScript,
}

impl ProxyMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProxyMode::Direct => "direct",
            ProxyMode::System => "system",
            ProxyMode::AutoDetect => "auto_detect",
            ProxyMode::FixedServers => "fixed_servers",
            ProxyMode::PacScript => "pac_script",
        }
    }
}

impl FromStr for ProxyMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "direct" => Ok(ProxyMode::Direct),
            "system" => Ok(ProxyMode::System),
            "auto_detect" => Ok(ProxyMode::AutoDetect),
            "fixed_servers" => Ok(ProxyMode::FixedServers),
            "pac_script" => Ok(ProxyMode::PacScript),
            other => Err(format!("unknown proxy mode '{other}'")),
        }
    }
}

impl fmt::Display for ProxyMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Proxy server address
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProxyServer {
    pub host: String,
    pub port: Option<u16>,
}

/// Parse a proxy server address
///
/// Accepts full URLs (`http://host:port`) and bare `host[:port]`, which is
/// read as an `http` URL. Without an explicit port the scheme default is used.
///
/// # Examples
/// ```
/// use mdm_policy::net::parse_proxy_server;
///
/// let server = parse_proxy_server("http://192.241.207.220:9090").unwrap();
/// assert_eq!(server.host, "192.241.207.220");
/// assert_eq!(server.port, Some(9090));
/// ```
pub fn parse_proxy_server(input: &str) -> Result<ProxyServer, String> {
    let input = input.trim();
    if input.is_empty() {
        return Err("empty value".to_string());
    }

    let url = if input.contains("://") {
        Url::parse(input)
    } else {
        Url::parse(&format!("http://{input}"))
    }
    .map_err(|err| err.to_string())?;

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host.to_string(),
        _ => return Err("missing host".to_string()),
    };

    Ok(ProxyServer {
        host,
        port: url.port_or_known_default(),
    })
}

/// Split a comma separated bypass list, dropping blanks
pub fn parse_bypass_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}
