pub mod parser;
pub mod value;

use std::{
    collections::{BTreeMap, btree_map},
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{BundleSyntaxError, PolicyError};

pub use parser::parse_overrides;
pub use value::{Value, ValueKind};

/// Key-value restriction payload pushed by a management agent
///
/// Keys are kept ordered so merged bundles render deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(transparent)]
pub struct Bundle {
    entries: BTreeMap<String, Value>,
}

impl Bundle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a bundle from a TOML or JSON file (chosen by the `.json` extension)
    pub fn load(path: &Path) -> Result<Self, PolicyError> {
        let content = fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let parsed = if is_json {
            serde_json::from_str(&content).map_err(BundleSyntaxError::from)
        } else {
            toml::from_str(&content).map_err(BundleSyntaxError::from)
        };
        parsed.map_err(|source| PolicyError::BundleParse {
            path: PathBuf::from(path),
            source,
        })
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.entries.iter()
    }

    /// Copy every entry of `other` into this bundle, replacing existing keys
    pub fn put_all(&mut self, other: &Bundle) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }

    /// Look up a boolean
    ///
    /// Returns `Ok(None)` when the key is absent and
    /// [`PolicyError::TypeMismatch`] when it holds a non-boolean value.
    pub fn get_bool(&self, key: &str) -> Result<Option<bool>, PolicyError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Bool(b)) => Ok(Some(*b)),
            Some(other) => Err(mismatch(key, ValueKind::Bool, other)),
        }
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>, PolicyError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::Int(i)) => Ok(Some(*i)),
            Some(other) => Err(mismatch(key, ValueKind::Int, other)),
        }
    }

    pub fn get_string(&self, key: &str) -> Result<Option<&str>, PolicyError> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(other) => Err(mismatch(key, ValueKind::String, other)),
        }
    }
}

fn mismatch(key: &str, expected: ValueKind, found: &Value) -> PolicyError {
    PolicyError::TypeMismatch {
        key: key.to_string(),
        expected,
        found: found.kind(),
    }
}

impl<'a> IntoIterator for &'a Bundle {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Bundle {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut bundle = Bundle::new();
        for (key, value) in iter {
            bundle.insert(key, value);
        }
        bundle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn typed_lookups_distinguish_missing_and_mismatch() {
        let bundle = Bundle::new()
            .with("DownloadsAllowed", false)
            .with("DownloadDirectory", "/custom/path")
            .with("PasswordsMinimumLength", 8);

        assert_eq!(bundle.get_bool("DownloadsAllowed").unwrap(), Some(false));
        assert_eq!(bundle.get_bool("Absent").unwrap(), None);
        assert_eq!(
            bundle.get_string("DownloadDirectory").unwrap(),
            Some("/custom/path")
        );
        assert_eq!(bundle.get_int("PasswordsMinimumLength").unwrap(), Some(8));

        match bundle.get_bool("DownloadDirectory") {
            Err(PolicyError::TypeMismatch {
                key,
                expected,
                found,
            }) => {
                assert_eq!(key, "DownloadDirectory");
                assert_eq!(expected, ValueKind::Bool);
                assert_eq!(found, ValueKind::String);
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }

    #[test]
    fn put_all_overrides_existing_keys() {
        let mut base = Bundle::new()
            .with("CameraDisabled", true)
            .with("DownloadsAllowed", true);
        let other = Bundle::new().with("DownloadsAllowed", false);

        base.put_all(&other);

        assert_eq!(base.len(), 2);
        assert_eq!(base.get_bool("CameraDisabled").unwrap(), Some(true));
        assert_eq!(base.get_bool("DownloadsAllowed").unwrap(), Some(false));
    }

    #[test]
    fn load_toml_bundle() {
        let mut tmp = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            tmp,
            "DownloadRestrictionEnabled = true\nDownloadDirectory = \"/sdcard/managed\"\nPasswordsMinimumLength = 6"
        )
        .unwrap();

        let bundle = Bundle::load(tmp.path()).unwrap();
        assert_eq!(
            bundle.get_bool("DownloadRestrictionEnabled").unwrap(),
            Some(true)
        );
        assert_eq!(
            bundle.get_string("DownloadDirectory").unwrap(),
            Some("/sdcard/managed")
        );
        assert_eq!(bundle.get_int("PasswordsMinimumLength").unwrap(), Some(6));
    }

    #[test]
    fn load_json_bundle() {
        let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(
            tmp,
            r#"{{"IncognitoRestrictionEnabled": true, "URLBlackList": "example.com"}}"#
        )
        .unwrap();

        let bundle = Bundle::load(tmp.path()).unwrap();
        assert_eq!(
            bundle.get_bool("IncognitoRestrictionEnabled").unwrap(),
            Some(true)
        );
        assert_eq!(
            bundle.get_string("URLBlackList").unwrap(),
            Some("example.com")
        );
    }

    #[test]
    fn load_rejects_unsupported_values() {
        let mut tmp = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(tmp, r#"{{"Ratio": 0.5}}"#).unwrap();

        let result = Bundle::load(tmp.path());
        assert!(matches!(
            result,
            Err(PolicyError::BundleParse {
                source: BundleSyntaxError::Json(_),
                ..
            })
        ));
    }

    #[test]
    fn toml_syntax_error_names_the_bundle() {
        let mut tmp = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(tmp, "DownloadsAllowed = ").unwrap();

        let err = Bundle::load(tmp.path()).unwrap_err();
        assert!(matches!(
            err,
            PolicyError::BundleParse {
                source: BundleSyntaxError::Toml(_),
                ..
            }
        ));
        assert!(err.to_string().starts_with("failed to parse bundle"));
    }
}
