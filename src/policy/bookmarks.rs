use std::hash::{DefaultHasher, Hash, Hasher};

use log::{debug, info};
use serde::Serialize;
use serde_json::Value as Json;

use crate::{bundle::Bundle, error::PolicyError};

use super::{BundleReader, Enforcement, Restriction};

pub const MANAGED_BOOKMARKS: &str = "ManagedBookmarks";

pub const ROOT_FOLDER_TITLE: &str = "Managed";
pub const FOLDER_MARKER: &str = "MDM";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum BookmarkNode {
    Bookmark { name: String, url: String },
    Folder(BookmarkFolder),
}

/// Folder owned by the management agent
///
/// `marker` tags the folder as managed; the root folder's marker also carries
/// a hash of the source JSON so an unchanged payload is not installed twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkFolder {
    pub name: String,
    pub marker: String,
    pub children: Vec<BookmarkNode>,
}

impl BookmarkFolder {
    fn bookmark_count(&self) -> usize {
        self.children
            .iter()
            .map(|node| match node {
                BookmarkNode::Bookmark { .. } => 1,
                BookmarkNode::Folder(folder) => folder.bookmark_count(),
            })
            .sum()
    }

    fn contains_url(&self, url: &str) -> bool {
        self.children.iter().any(|node| match node {
            BookmarkNode::Bookmark { url: u, .. } => u == url,
            BookmarkNode::Folder(folder) => folder.contains_url(url),
        })
    }
}

/// Parsed bookmark tree plus notes about entries that were skipped
#[derive(Debug, Default)]
pub struct ParsedBookmarks {
    pub nodes: Vec<BookmarkNode>,
    pub skipped: Vec<String>,
}

/// Parse the `ManagedBookmarks` JSON payload
///
/// The payload is an array of `{"name", "url"}` bookmarks and
/// `{"name", "children": [...]}` folders. `children` may also be a string
/// holding such an array. Entries that are neither are skipped and noted.
pub fn parse_managed_bookmarks(json: &str) -> Result<ParsedBookmarks, PolicyError> {
    let value: Json = serde_json::from_str(json).map_err(|err| PolicyError::InvalidBookmarks {
        reason: err.to_string(),
    })?;

    let mut skipped = Vec::new();
    let nodes = parse_children(&value, ROOT_FOLDER_TITLE, &mut skipped)?;
    Ok(ParsedBookmarks { nodes, skipped })
}

fn parse_children(
    value: &Json,
    parent: &str,
    skipped: &mut Vec<String>,
) -> Result<Vec<BookmarkNode>, PolicyError> {
    let owned;
    let value = match value {
        Json::String(nested) => {
            owned = serde_json::from_str::<Json>(nested).map_err(|err| {
                PolicyError::InvalidBookmarks {
                    reason: format!("children of '{parent}': {err}"),
                }
            })?;
            &owned
        }
        other => other,
    };

    let Json::Array(entries) = value else {
        return Err(PolicyError::InvalidBookmarks {
            reason: format!("children of '{parent}' must be an array"),
        });
    };

    let mut nodes = Vec::with_capacity(entries.len());
    for (idx, entry) in entries.iter().enumerate() {
        let name = entry.get("name").and_then(Json::as_str);
        let url = entry.get("url").and_then(Json::as_str);
        let children = entry.get("children");

        match (name, url, children) {
            (Some(name), Some(url), _) => nodes.push(BookmarkNode::Bookmark {
                name: name.to_string(),
                url: url.to_string(),
            }),
            (Some(name), None, Some(children)) => {
                let children = parse_children(children, name, skipped)?;
                nodes.push(BookmarkNode::Folder(BookmarkFolder {
                    name: name.to_string(),
                    marker: FOLDER_MARKER.to_string(),
                    children,
                }));
            }
            _ => skipped.push(format!(
                "entry {idx} of '{parent}' is neither a bookmark nor a folder"
            )),
        }
    }

    Ok(nodes)
}

fn payload_hash(json: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    json.hash(&mut hasher);
    hasher.finish()
}

/// Bookmarks pushed by the management agent into a read-only `Managed` folder
#[derive(Debug, Clone, Default)]
pub struct ManagedBookmarksRestriction {
    json: Option<String>,
    root: Option<BookmarkFolder>,
    created: bool,
}

impl ManagedBookmarksRestriction {
    const NAME: &'static str = "ManagedBookmarksRestriction";

    pub fn new() -> Self {
        Self::default()
    }

    /// The JSON payload currently installed
    pub fn value(&self) -> Option<&str> {
        self.json.as_deref()
    }

    pub fn root(&self) -> Option<&BookmarkFolder> {
        self.root.as_ref()
    }

    /// Whether the last enforcement installed a new tree
    pub fn bookmarks_were_created(&self) -> bool {
        self.created
    }

    pub fn bookmark_count(&self) -> usize {
        self.root.as_ref().map_or(0, BookmarkFolder::bookmark_count)
    }

    /// Whether `url` belongs to the managed tree (and so cannot be edited)
    pub fn is_managed_url(&self, url: &str) -> bool {
        self.root.as_ref().is_some_and(|root| root.contains_url(url))
    }

    fn remove_tree(&mut self) {
        if self.root.take().is_some() {
            info!("[{}] removing managed bookmarks", Self::NAME);
        }
        self.json = None;
        self.created = false;
    }
}

impl Restriction for ManagedBookmarksRestriction {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn is_enabled(&self) -> bool {
        self.root.is_some()
    }

    fn enforce(&mut self, restrictions: &Bundle) -> Enforcement {
        let mut reader = BundleReader::new(Self::NAME, restrictions);

        let Some(json) = reader.string(MANAGED_BOOKMARKS) else {
            self.remove_tree();
            return reader.finish(false);
        };

        let parsed = match parse_managed_bookmarks(&json) {
            Ok(parsed) => parsed,
            Err(err) => {
                reader.reject(MANAGED_BOOKMARKS, err.to_string());
                self.remove_tree();
                return reader.finish(false);
            }
        };
        for note in parsed.skipped {
            reader.reject(MANAGED_BOOKMARKS, note);
        }

        let marker = format!("{FOLDER_MARKER}:{}", payload_hash(&json));
        if self.root.as_ref().is_some_and(|root| root.marker == marker) {
            debug!("[{}] payload unchanged, keeping tree", Self::NAME);
            self.created = false;
        } else {
            self.root = Some(BookmarkFolder {
                name: ROOT_FOLDER_TITLE.to_string(),
                marker,
                children: parsed.nodes,
            });
            self.created = true;
            info!(
                "[{}] installed {} managed bookmarks",
                Self::NAME,
                self.bookmark_count()
            );
        }
        self.json = Some(json);

        reader.finish(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYLOAD: &str = r#"[
        {"name": "Chromium for Snapdragon", "url": "www.codeaurora.org/forums/chromium-snapdragon"},
        {"name": "Chromium Browser for Snapdragon", "url": "www.codeaurora.org/xwiki/bin/Chromium+for+Snapdragon"},
        {"name": "Repos And Patches", "children": [
            {"name": "Code Aurora git repositories", "url": "www.codeaurora.org/cgit/quic/chrome4sdp"},
            {"name": "Patches", "url": "www.codeaurora.org/patches/quic/chrome4snapdragon"}
        ]}
    ]"#;

    fn send(r: &mut ManagedBookmarksRestriction, payload: Option<&str>) -> Enforcement {
        let mut bundle = Bundle::new();
        if let Some(payload) = payload {
            bundle.insert(MANAGED_BOOKMARKS, payload);
        }
        r.enforce(&bundle)
    }

    #[test]
    fn installs_tree_once_and_removes_it() {
        let mut r = ManagedBookmarksRestriction::new();
        send(&mut r, None);
        assert!(!r.is_enabled());
        assert_eq!(r.value(), None);

        send(&mut r, Some(PAYLOAD));
        assert!(r.is_enabled());
        assert_eq!(r.value(), Some(PAYLOAD));
        assert!(r.bookmarks_were_created());
        assert_eq!(r.bookmark_count(), 4);

        let root = r.root().unwrap();
        assert_eq!(root.name, ROOT_FOLDER_TITLE);
        assert!(root.marker.starts_with("MDM:"));
        assert_eq!(root.children.len(), 3);
        match &root.children[2] {
            BookmarkNode::Folder(folder) => {
                assert_eq!(folder.name, "Repos And Patches");
                assert_eq!(folder.marker, FOLDER_MARKER);
                assert_eq!(folder.children.len(), 2);
            }
            other => panic!("expected folder, got {other:?}"),
        }
        assert!(r.is_managed_url("www.codeaurora.org/cgit/quic/chrome4sdp"));
        assert!(!r.is_managed_url("www.example.com"));

        // same payload again: nothing new is created
        send(&mut r, Some(PAYLOAD));
        assert!(r.is_enabled());
        assert!(!r.bookmarks_were_created());

        send(&mut r, None);
        assert!(!r.is_enabled());
        assert_eq!(r.value(), None);
        assert!(r.root().is_none());
    }

    #[test]
    fn children_may_be_a_json_string() {
        let payload = r#"[{"name": "Folder", "children": "[{\"name\": \"A\", \"url\": \"a.com\"}]"}]"#;
        let parsed = parse_managed_bookmarks(payload).unwrap();
        assert!(parsed.skipped.is_empty());
        match &parsed.nodes[0] {
            BookmarkNode::Folder(folder) => assert_eq!(folder.children.len(), 1),
            other => panic!("expected folder, got {other:?}"),
        }
    }

    #[test]
    fn skips_entries_that_are_neither() {
        let mut r = ManagedBookmarksRestriction::new();
        let enforcement = send(
            &mut r,
            Some(r#"[{"name": "A", "url": "a.com"}, {"name": "orphan"}]"#),
        );
        assert!(r.is_enabled());
        assert_eq!(r.bookmark_count(), 1);
        assert_eq!(enforcement.malformed().count(), 1);
    }

    #[test]
    fn invalid_json_lifts_restriction() {
        let mut r = ManagedBookmarksRestriction::new();
        send(&mut r, Some(PAYLOAD));
        assert!(r.is_enabled());

        let enforcement = send(&mut r, Some("{not json"));
        assert!(!r.is_enabled());
        assert_eq!(enforcement.malformed().count(), 1);
    }

    #[test]
    fn top_level_must_be_array() {
        let result = parse_managed_bookmarks(r#"{"name": "A", "url": "a.com"}"#);
        assert!(matches!(result, Err(PolicyError::InvalidBookmarks { .. })));
    }
}
