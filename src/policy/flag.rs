use log::debug;

use crate::bundle::Bundle;

use super::{BundleReader, Enforcement, Restriction};

pub const INCOGNITO_RESTRICTION_ENABLED: &str = "IncognitoRestrictionEnabled";
pub const DEV_TOOLS_ENABLED: &str = "DevToolsEnabled";
pub const EDIT_BOOKMARKS_ENABLED: &str = "EditBookmarksEnabled";

/// How the bundle key maps onto the restriction state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    /// `key = true` turns the restriction on
    Restricts,
    /// `key = false` turns the restriction on: the key names the feature, not
    /// the restriction. An absent key leaves the feature available.
    ///
    /// Fails open: a value that is not a boolean is reported as malformed and
    /// also leaves the feature available, rather than being read as `false`.
    Permits,
}

/// Single-key on/off restriction
#[derive(Debug, Clone)]
pub struct FlagRestriction {
    name: &'static str,
    key: &'static str,
    polarity: Polarity,
    enabled: bool,
}

impl FlagRestriction {
    pub fn new(name: &'static str, key: &'static str, polarity: Polarity) -> Self {
        Self {
            name,
            key,
            polarity,
            enabled: false,
        }
    }

    /// Forbids incognito tabs while enabled
    pub fn incognito() -> Self {
        Self::new(
            "IncognitoRestriction",
            INCOGNITO_RESTRICTION_ENABLED,
            Polarity::Restricts,
        )
    }

    /// Turns off web contents debugging while enabled
    pub fn dev_tools() -> Self {
        Self::new("DevToolsRestriction", DEV_TOOLS_ENABLED, Polarity::Permits)
    }

    /// Makes bookmarks read-only while enabled
    pub fn edit_bookmarks() -> Self {
        Self::new(
            "EditBookmarksRestriction",
            EDIT_BOOKMARKS_ENABLED,
            Polarity::Permits,
        )
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Whether the feature this flag guards is available to the user
    pub fn feature_allowed(&self) -> bool {
        !self.enabled
    }
}

impl Restriction for FlagRestriction {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enforce(&mut self, restrictions: &Bundle) -> Enforcement {
        let mut reader = BundleReader::new(self.name, restrictions);
        self.enabled = match self.polarity {
            Polarity::Restricts => reader.bool_or(self.key, false),
            Polarity::Permits => reader.bool(self.key).is_some_and(|permitted| !permitted),
        };
        debug!("[{}] enforce [{}]", self.name, self.enabled);
        reader.finish(self.enabled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::Value;
    use rstest::rstest;

    #[rstest]
    #[case(FlagRestriction::incognito(), None, false)]
    #[case(FlagRestriction::incognito(), Some(false), false)]
    #[case(FlagRestriction::incognito(), Some(true), true)]
    #[case(FlagRestriction::dev_tools(), None, false)]
    #[case(FlagRestriction::dev_tools(), Some(true), false)]
    #[case(FlagRestriction::dev_tools(), Some(false), true)]
    #[case(FlagRestriction::edit_bookmarks(), None, false)]
    #[case(FlagRestriction::edit_bookmarks(), Some(true), false)]
    #[case(FlagRestriction::edit_bookmarks(), Some(false), true)]
    fn test_flag_polarity(
        #[case] mut restriction: FlagRestriction,
        #[case] value: Option<bool>,
        #[case] expect_enabled: bool,
    ) {
        let mut bundle = Bundle::new();
        if let Some(value) = value {
            bundle.insert(restriction.key(), value);
        }

        let enforcement = restriction.enforce(&bundle);

        assert_eq!(enforcement.enabled, expect_enabled);
        assert_eq!(restriction.is_enabled(), expect_enabled);
        assert_eq!(restriction.feature_allowed(), !expect_enabled);
    }

    #[test]
    fn lifting_the_restriction_restores_the_feature() {
        let mut dev_tools = FlagRestriction::dev_tools();
        dev_tools.enforce(&Bundle::new().with(DEV_TOOLS_ENABLED, false));
        assert!(!dev_tools.feature_allowed());

        dev_tools.enforce(&Bundle::new());
        assert!(dev_tools.feature_allowed());
    }

    #[rstest]
    #[case(FlagRestriction::dev_tools(), Value::Int(0))]
    #[case(FlagRestriction::dev_tools(), Value::from("false"))]
    #[case(FlagRestriction::edit_bookmarks(), Value::Int(0))]
    #[case(FlagRestriction::edit_bookmarks(), Value::from("no"))]
    fn malformed_permit_key_fails_open(
        #[case] mut restriction: FlagRestriction,
        #[case] value: Value,
    ) {
        // a restriction already in force is lifted too
        restriction.enforce(&Bundle::new().with(restriction.key(), false));
        assert!(restriction.is_enabled());

        let enforcement = restriction.enforce(&Bundle::new().with(restriction.key(), value));
        assert!(!restriction.is_enabled());
        assert!(restriction.feature_allowed());
        assert_eq!(enforcement.malformed().count(), 1);
    }
}
