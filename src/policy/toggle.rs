use log::debug;

use crate::bundle::Bundle;

use super::{BundleReader, Enforcement, Restriction};

pub const AUTO_FILL_RESTRICTION_ENABLED: &str = "AutoFillRestrictionEnabled";
pub const AUTO_FILL_ALLOWED: &str = "AutoFillAllowed";

pub const DO_NOT_TRACK_ENABLED: &str = "DoNotTrackEnabled";
pub const DO_NOT_TRACK_VALUE: &str = "DoNotTrackValue";

pub const THIRD_PARTY_COOKIES_ENABLED: &str = "ThirdPartyCookiesRestrictionEnabled";
pub const THIRD_PARTY_COOKIES_ALLOWED: &str = "ThirdPartyCookiesAllowed";

/// Restriction that pins a boolean browser setting to a managed value
///
/// | enabled key | value key | enabled | value   |
/// |-------------|-----------|---------|---------|
/// | not set     | any       | no      | default |
/// | false       | any       | no      | default |
/// | true        | not set   | yes     | default |
/// | true        | v         | yes     | v       |
///
/// While disabled the user's own setting applies; `value` only reports the
/// default so callers never see a stale managed value.
#[derive(Debug, Clone)]
pub struct ToggleRestriction {
    name: &'static str,
    enabled_key: &'static str,
    value_key: &'static str,
    default_value: bool,
    enabled: bool,
    value: bool,
}

impl ToggleRestriction {
    pub fn new(
        name: &'static str,
        enabled_key: &'static str,
        value_key: &'static str,
        default_value: bool,
    ) -> Self {
        Self {
            name,
            enabled_key,
            value_key,
            default_value,
            enabled: false,
            value: default_value,
        }
    }

    pub fn autofill() -> Self {
        Self::new(
            "AutoFillRestriction",
            AUTO_FILL_RESTRICTION_ENABLED,
            AUTO_FILL_ALLOWED,
            true,
        )
    }

    pub fn do_not_track() -> Self {
        Self::new(
            "DoNotTrackRestriction",
            DO_NOT_TRACK_ENABLED,
            DO_NOT_TRACK_VALUE,
            true,
        )
    }

    pub fn third_party_cookies() -> Self {
        Self::new(
            "ThirdPartyCookiesRestriction",
            THIRD_PARTY_COOKIES_ENABLED,
            THIRD_PARTY_COOKIES_ALLOWED,
            true,
        )
    }

    pub fn value(&self) -> bool {
        self.value
    }

    /// The managed value, or `None` when the user controls the setting
    pub fn managed_value(&self) -> Option<bool> {
        self.enabled.then_some(self.value)
    }

    /// Resolve the setting against the user's own preference
    pub fn effective(&self, user_value: bool) -> bool {
        self.managed_value().unwrap_or(user_value)
    }
}

impl Restriction for ToggleRestriction {
    fn name(&self) -> &'static str {
        self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn enforce(&mut self, restrictions: &Bundle) -> Enforcement {
        let mut reader = BundleReader::new(self.name, restrictions);
        self.enabled = reader.bool_or(self.enabled_key, false);
        self.value = if self.enabled {
            reader.bool_or(self.value_key, self.default_value)
        } else {
            self.default_value
        };
        debug!("[{}] enabled={} value={}", self.name, self.enabled, self.value);
        reader.finish(self.enabled)
    }
}
