use std::cmp::Ordering;

use url::{Host, Url};

use crate::error::PolicyError;

/// Host part of a filter
#[derive(Debug, Clone, PartialEq, Eq)]
enum HostPattern {
    Any,
    Domain { name: String, subdomains: bool },
}

/// One entry of a URL black or white list
///
/// Format: `[scheme://][.]host[:port][/path]` or `*`.
/// - `*` (alone or as the host) matches anything
/// - a host matches itself and its subdomains unless prefixed with `.`
/// - no scheme or port means any scheme or port; ports are compared against
///   the URL's explicit port or its scheme default
/// - the path is a prefix of the URL path; a `?query` must equal the URL's
/// - `file://` filters only carry a path, `file://*` matches every file URL
///
/// Hosts and paths are normalised the way `url` normalises URLs: IDNA hosts
/// become punycode, a trailing `.` is dropped and paths are percent-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlFilter {
    raw: String,
    scheme: Option<String>,
    host: HostPattern,
    port: Option<u16>,
    path: String,
    query: Option<String>,
}

/// Ordering key: host length, exact host, path length, query, scheme, port
type Specificity = (usize, bool, usize, bool, bool, bool);

impl UrlFilter {
    /// Parse a single filter entry
    ///
    /// # Examples
    /// ```
    /// use mdm_policy::net::UrlFilter;
    /// use url::{Host, Url};
    ///
    /// let filter = UrlFilter::parse("example.com").unwrap();
    /// assert!(filter.matches(&Url::parse("https://foo.example.com:8080/path").unwrap()));
    /// ```
    pub fn parse(entry: &str) -> Result<Self, PolicyError> {
        parse_single_filter(entry.trim()).map_err(|reason| PolicyError::InvalidUrlFilter {
            entry: entry.to_string(),
            reason,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn matches(&self, url: &Url) -> bool {
        if let Some(scheme) = &self.scheme
            && scheme != url.scheme()
        {
            return false;
        }

        if let HostPattern::Domain { name, subdomains } = &self.host {
            let Some(host) = url.host_str() else {
                return false;
            };
            let host = host.strip_suffix('.').unwrap_or(host);
            let exact = host == name;
            let below = *subdomains
                && host.len() > name.len()
                && host.ends_with(name.as_str())
                && host.as_bytes()[host.len() - name.len() - 1] == b'.';
            if !exact && !below {
                return false;
            }
        }

        if let Some(port) = self.port
            && url.port_or_known_default() != Some(port)
        {
            return false;
        }

        if let Some(query) = &self.query
            && url.query() != Some(query.as_str())
        {
            return false;
        }

        url.path().starts_with(&self.path)
    }

    fn specificity(&self) -> Specificity {
        let (host_len, exact) = match &self.host {
            HostPattern::Any => (0, false),
            HostPattern::Domain { name, subdomains } => (name.len(), !subdomains),
        };
        (
            host_len,
            exact,
            self.path.len(),
            self.query.is_some(),
            self.scheme.is_some(),
            self.port.is_some(),
        )
    }
}

fn parse_single_filter(input: &str) -> Result<UrlFilter, String> {
    if input.is_empty() {
        return Err("empty value".to_string());
    }

    let raw = input.to_string();
    if input == "*" {
        return Ok(UrlFilter {
            raw,
            scheme: None,
            host: HostPattern::Any,
            port: None,
            path: String::new(),
            query: None,
        });
    }

    let (scheme, rest) = match input.split_once("://") {
        Some((scheme, _)) if scheme.is_empty() => return Err("empty scheme".to_string()),
        Some((scheme, rest)) => (Some(scheme.to_ascii_lowercase()), rest),
        None => (None, input),
    };

    if scheme.as_deref() == Some("file") {
        let (path, query) = match rest {
            "*" => (String::new(), None),
            rest if rest.starts_with('/') => normalize_path("file://", rest)?,
            rest => normalize_path("file:///", rest)?,
        };
        return Ok(UrlFilter {
            raw,
            scheme,
            host: HostPattern::Any,
            port: None,
            path,
            query,
        });
    }

    let (authority, path) = match rest.find(['/', '?']) {
        Some(idx) => rest.split_at(idx),
        None => (rest, ""),
    };

    if authority.starts_with('[') {
        return Err("IPv6 hosts are not supported".to_string());
    }

    let (host, port) = match authority.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .map_err(|_| format!("invalid port '{port}'"))?;
            (host, Some(port))
        }
        None => (authority, None),
    };

    let host = if host == "*" {
        HostPattern::Any
    } else if let Some(exact) = host.strip_prefix('.') {
        HostPattern::Domain {
            name: normalize_host(exact)?,
            subdomains: false,
        }
    } else {
        HostPattern::Domain {
            name: normalize_host(host)?,
            subdomains: true,
        }
    };

    let (path, query) = normalize_path("http://filter.invalid", path)?;
    Ok(UrlFilter {
        raw,
        scheme,
        host,
        port,
        path,
        query,
    })
}

/// Host in the form `Url::host_str` reports it, without a trailing `.`
fn normalize_host(host: &str) -> Result<String, String> {
    let host = host.strip_suffix('.').unwrap_or(host);
    if host.is_empty() {
        return Err("missing host".to_string());
    }
    match Host::parse(host) {
        Ok(Host::Domain(name)) => Ok(name.strip_suffix('.').unwrap_or(&name).to_string()),
        Ok(Host::Ipv4(addr)) => Ok(addr.to_string()),
        Ok(Host::Ipv6(_)) => Err("IPv6 hosts are not supported".to_string()),
        Err(err) => Err(format!("invalid host '{host}': {err}")),
    }
}

/// Path and query encoded the way `Url` encodes them; a bare `/` is no path
fn normalize_path(base: &str, raw: &str) -> Result<(String, Option<String>), String> {
    if raw.is_empty() {
        return Ok((String::new(), None));
    }
    let url = Url::parse(&format!("{base}{raw}")).map_err(|err| format!("invalid path: {err}"))?;
    let path = match url.path() {
        "/" => String::new(),
        path => path.to_string(),
    };
    Ok((path, url.query().map(str::to_string)))
}

/// Split a comma separated filter list
///
/// Empty entries are skipped. Invalid entries are returned separately so the
/// caller can report them while still enforcing the valid ones.
pub fn parse_filter_list(list: &str) -> (Vec<UrlFilter>, Vec<PolicyError>) {
    let mut filters = Vec::new();
    let mut errors = Vec::new();

    for entry in list.split(',') {
        if entry.trim().is_empty() {
            continue;
        }
        match UrlFilter::parse(entry) {
            Ok(filter) => {
                if !filters.contains(&filter) {
                    filters.push(filter);
                }
            }
            Err(err) => errors.push(err),
        }
    }

    (filters, errors)
}

/// Black list plus white list exceptions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlFilterSet {
    pub blacklist: Vec<UrlFilter>,
    pub whitelist: Vec<UrlFilter>,
}

impl UrlFilterSet {
    pub fn is_empty(&self) -> bool {
        self.blacklist.is_empty() && self.whitelist.is_empty()
    }

    /// Whether `url` is blocked
    ///
    /// The most specific matching filter decides; a white list filter wins a
    /// tie. URLs that do not parse are never blocked.
    pub fn is_blocked(&self, url: &str) -> bool {
        let Ok(url) = Url::parse(url.trim()) else {
            return false;
        };

        let blocking = most_specific(&self.blacklist, &url);
        let allowing = most_specific(&self.whitelist, &url);

        match (blocking, allowing) {
            (None, _) => false,
            (Some(_), None) => true,
            (Some(block), Some(allow)) => block.cmp(&allow) == Ordering::Greater,
        }
    }
}

fn most_specific(filters: &[UrlFilter], url: &Url) -> Option<Specificity> {
    filters
        .iter()
        .filter(|filter| filter.matches(url))
        .map(UrlFilter::specificity)
        .max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn blacklist(list: &str) -> UrlFilterSet {
        let (filters, errors) = parse_filter_list(list);
        assert!(errors.is_empty(), "unexpected errors: {errors:?}");
        UrlFilterSet {
            blacklist: filters,
            whitelist: Vec::new(),
        }
    }

    // === File based ===

    #[rstest]
    #[case("file:///data/local/tmp/bl-test/1.html", "file:///data/local/tmp/bl-test/1.html", true)]
    #[case("file:///data/local/tmp/bl-test", "file:///data/local/tmp/bl-test/2.html", true)]
    #[case("file:///data/local/tmp", "file:///data/local/tmp/bl-test/3.html", true)]
    #[case("file://*", "file:///data/local/tmp/bl-test/4.html", true)]
    #[case("file://*", "http://www.google.com", false)]
    #[case("*", "file:///data/local/tmp/bl-test/5.html", true)]
    #[case("file:///data/local/tmp", "file:///sdcard/other.html", false)]
    fn test_file_filters(#[case] filter: &str, #[case] url: &str, #[case] blocked: bool) {
        assert_eq!(blacklist(filter).is_blocked(url), blocked);
    }

    // === Server based ===

    #[rstest]
    #[case("http://server:8080/path", "http://server:8080/path", true)]
    #[case("http://server:8080/path", "https://server:8080/path", false)]
    #[case("http://server:8080/path", "http://server:8080", false)]
    #[case("http://server:8080/path", "http://server:9090/path", false)]
    #[case("http://server:8080/path", "http://server/path", false)]
    #[case("http://server:8080/path", "http://server:80/path", false)]
    #[case("http://server:8080", "http://server:8080/path", true)]
    #[case("http://server:8080", "http://server:8080", true)]
    #[case("http://server:8080", "http://server", false)]
    #[case("http://server", "http://server:8080/path", true)]
    #[case("http://server", "https://server:8080/path", false)]
    #[case("http://server", "ftp://server", false)]
    #[case("http://server", "http://server:80/path", true)]
    #[case("http://server", "http://server", true)]
    fn test_server_filters(#[case] filter: &str, #[case] url: &str, #[case] blocked: bool) {
        assert_eq!(blacklist(filter).is_blocked(url), blocked);
    }

    // === Host forms ===

    #[rstest]
    #[case("example.com", "http://example.com", true)]
    #[case("example.com", "https://foo.example.com:8080/path", true)]
    #[case("example.com", "ftp://example.com:80", true)]
    #[case("example.com", "http://www.google.com", false)]
    #[case("example.com", "http://notexample.com", false)]
    #[case("192.168.0.123", "ftp://192.168.0.123:8080/path", true)]
    #[case("192.168.0.123", "http://192.168.0.124", false)]
    #[case("https://ssl.server.com", "https://foo.ssl.server.com:8080/path", true)]
    #[case("https://ssl.server.com", "http://ssl.server.com", false)]
    #[case("https://ssl.server.com", "ftp://ssl.server.com", false)]
    #[case("hosting.com/bad_path", "http://hosting.com:8080/bad_path", true)]
    #[case("hosting.com/bad_path", "ftp://foo.hosting.com:8080/bad_path", true)]
    #[case("hosting.com/bad_path", "http://hosting.com:8080", false)]
    #[case("hosting.com/bad_path", "https://foo.hosting.com", false)]
    #[case(".exact.hostname.com", "http://exact.hostname.com:8080/path", true)]
    #[case(".exact.hostname.com", "ftp://exact.hostname.com", true)]
    #[case(".exact.hostname.com", "http://foo.exact.hostname.com", false)]
    #[case("EXAMPLE.com", "http://Example.COM", true)]
    #[case("example.com", "http://example.com./", true)]
    #[case("example.com.", "http://foo.example.com/", true)]
    #[case(".example.com", "http://example.com./path", true)]
    #[case("bücher.de", "http://bücher.de/", true)]
    #[case("bücher.de", "http://xn--bcher-kva.de/katalog", true)]
    #[case("xn--bcher-kva.de", "http://bücher.de/", true)]
    #[case("example.com/a b", "http://example.com/a b", true)]
    #[case("example.com/a b", "http://example.com/a%20b/c", true)]
    #[case("example.com/a b", "http://example.com/a", false)]
    fn test_host_filters(#[case] filter: &str, #[case] url: &str, #[case] blocked: bool) {
        assert_eq!(blacklist(filter).is_blocked(url), blocked);
    }

    #[rstest]
    #[case("http://www.google.com")]
    #[case("ftp://hosting.com:8080/bad_path")]
    #[case("https://foo.ssl.server.com:8080/path")]
    #[case("http://192.168.0.123:8080/path")]
    #[case("http://server")]
    fn test_universal_filter_blocks_everything(#[case] url: &str) {
        assert!(blacklist("*").is_blocked(url));
    }

    #[test]
    fn test_multiple_filters_with_whitespace() {
        let set = blacklist("    hosting.com/bad_path  , https://ssl.server.com\t,     example.com  ");
        assert_eq!(set.blacklist.len(), 3);
        assert!(set.is_blocked("http://foo.hosting.com:8080/bad_path"));
        assert!(set.is_blocked("https://ssl.server.com"));
        assert!(!set.is_blocked("http://ssl.server.com"));
        assert!(set.is_blocked("ftp://foo.example.com:8080/path"));
        assert!(!set.is_blocked("http://www.yahoo.com"));
    }

    // === White list exceptions ===

    #[rstest]
    #[case("http://facebook.com", true)]
    #[case("http://google.com", false)]
    #[case("ftp://google.com", false)]
    #[case("http://fr.google.com", false)]
    #[case("http://yahoo.com", true)]
    #[case("https://yahoo.com:8080", false)]
    #[case("https://us.yahoo.com", false)]
    #[case("http://foo.com:80", false)]
    #[case("https://foo.com:80", true)]
    #[case("http://foo.com:8080", true)]
    #[case("http://us.foo.com:80", false)]
    #[case("http://bar.com:80/path/sub1", false)]
    #[case("http://bar.com:80/anotherpath", true)]
    #[case("http://bar.com:8080/path", true)]
    #[case("http://fubar.com:8080", false)]
    #[case("http://fr.fubar.com", true)]
    fn test_whitelist_exceptions(#[case] url: &str, #[case] blocked: bool) {
        let (blacklist, _) = parse_filter_list("*");
        let (whitelist, errors) = parse_filter_list(
            "google.com, https://yahoo.com, http://foo.com:80, http://bar.com:80/path, .fubar.com",
        );
        assert!(errors.is_empty());
        let set = UrlFilterSet {
            blacklist,
            whitelist,
        };
        assert_eq!(set.is_blocked(url), blocked);
    }

    #[test]
    fn test_more_specific_blacklist_beats_whitelist() {
        let (blacklist, _) = parse_filter_list("example.com/private");
        let (whitelist, _) = parse_filter_list("example.com");
        let set = UrlFilterSet {
            blacklist,
            whitelist,
        };
        assert!(set.is_blocked("http://example.com/private/data"));
        assert!(!set.is_blocked("http://example.com/public"));
    }

    #[test]
    fn test_equal_specificity_whitelist_wins() {
        let (blacklist, _) = parse_filter_list("example.com");
        let (whitelist, _) = parse_filter_list("example.com");
        let set = UrlFilterSet {
            blacklist,
            whitelist,
        };
        assert!(!set.is_blocked("http://example.com"));
    }

    #[rstest]
    #[case("example.com/page?x=1", "http://example.com/page?x=1", true)]
    #[case("example.com/page?x=1", "http://example.com/page?x=2", false)]
    #[case("example.com/page?x=1", "http://example.com/page", false)]
    #[case("example.com?x=1", "http://example.com/any?x=1", true)]
    #[case("example.com/page", "http://example.com/page?x=2", true)]
    fn test_query_filters(#[case] filter: &str, #[case] url: &str, #[case] blocked: bool) {
        assert_eq!(blacklist(filter).is_blocked(url), blocked);
    }

    #[test]
    fn test_query_is_more_specific_than_path_alone() {
        let (blacklist, _) = parse_filter_list("example.com/page?x=1");
        let (whitelist, _) = parse_filter_list("example.com/page");
        let set = UrlFilterSet {
            blacklist,
            whitelist,
        };
        assert!(set.is_blocked("http://example.com/page?x=1"));
        assert!(!set.is_blocked("http://example.com/page?x=2"));
    }

    #[test]
    fn test_file_filter_path_is_percent_encoded() {
        assert!(blacklist("file:///sdcard/my docs").is_blocked("file:///sdcard/my%20docs/a.html"));
    }

    #[test]
    fn test_unparseable_url_is_not_blocked() {
        assert!(!blacklist("*").is_blocked("not a url"));
    }

    #[rstest]
    #[case("example.com:99999", "port number too large")]
    #[case("example.com:", "empty port")]
    #[case("://example.com", "empty scheme")]
    #[case("http://:8080", "missing host")]
    #[case("[::1]", "IPv6 host")]
    #[case(".", "dot only")]
    #[case("exa mple.com", "space in host")]
    fn test_invalid_filters(#[case] entry: &str, #[case] _description: &str) {
        let result = UrlFilter::parse(entry);
        assert!(matches!(
            result,
            Err(PolicyError::InvalidUrlFilter { .. })
        ));
    }

    #[test]
    fn test_invalid_entries_do_not_drop_valid_ones() {
        let (filters, errors) = parse_filter_list("example.com, bad:port, , example.com");
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].as_str(), "example.com");
        assert_eq!(errors.len(), 1);
    }
}
