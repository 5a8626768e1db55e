use serde::Serialize;

use crate::{
    bundle::Bundle,
    cli::Format,
    error::PolicyError,
    policy::{Enforcement, FallbackReason, PolicySnapshot, Restrictions},
};

/// What one evaluation produced, ready for rendering
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub policy: PolicySnapshot,
    /// Keys whose values were present but unusable
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<RejectedKey>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub url_checks: Vec<UrlCheck>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedKey {
    pub restriction: String,
    pub key: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UrlCheck {
    pub url: String,
    pub blocked: bool,
}

/// Enforce `bundle` and collect the resulting state
pub fn evaluate(restrictions: &mut Restrictions, bundle: &Bundle, check_urls: &[String]) -> Report {
    let enforcements = restrictions.enforce(bundle);

    let url_checks = check_urls
        .iter()
        .map(|url| UrlCheck {
            url: url.clone(),
            blocked: restrictions.url_filter.is_blocked(url),
        })
        .collect();

    Report {
        policy: restrictions.snapshot(),
        rejected: rejected_keys(&enforcements),
        url_checks,
    }
}

fn rejected_keys(enforcements: &[Enforcement]) -> Vec<RejectedKey> {
    enforcements
        .iter()
        .flat_map(|enforcement| {
            enforcement.fallbacks.iter().filter_map(|fallback| match &fallback.reason {
                FallbackReason::Malformed(reason) => Some(RejectedKey {
                    restriction: enforcement.restriction.to_string(),
                    key: fallback.key.clone(),
                    reason: reason.clone(),
                }),
                FallbackReason::Missing => None,
            })
        })
        .collect()
}

pub fn render(report: &Report, format: Format) -> Result<String, PolicyError> {
    match format {
        Format::Toml => toml::to_string(report).map_err(|err| PolicyError::Render(err.to_string())),
        Format::Json => serde_json::to_string_pretty(report)
            .map_err(|err| PolicyError::Render(err.to_string())),
    }
}
