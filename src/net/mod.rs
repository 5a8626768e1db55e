pub mod filter;
pub mod proxy;

// Re-export main types and functions
pub use filter::{UrlFilter, UrlFilterSet, parse_filter_list};
pub use proxy::{ProxyMode, ProxyServer, parse_bypass_list, parse_proxy_server};
