use crate::error::PolicyError;

use super::{Bundle, Value};

/// Parse `KEY=VALUE` override entries into a bundle
///
/// Values are typed by their text: `true`/`false` become booleans, anything
/// that parses as a signed 64-bit integer becomes an integer, and everything
/// else is kept as a string (surrounding whitespace removed). Later entries
/// override earlier ones with the same key.
///
/// # Examples
/// ```
/// use mdm_policy::bundle::{Value, parse_overrides};
///
/// let entries = vec!["DownloadsAllowed=false".to_string()];
/// let bundle = parse_overrides(&entries).unwrap();
/// assert_eq!(bundle.get("DownloadsAllowed"), Some(&Value::Bool(false)));
/// ```
pub fn parse_overrides(entries: &[String]) -> Result<Bundle, PolicyError> {
    let mut bundle = Bundle::new();

    for raw in entries {
        if raw.trim().is_empty() {
            continue;
        }

        let (key, value) = parse_single_override(raw).map_err(|reason| {
            PolicyError::InvalidOverride {
                entry: raw.clone(),
                reason,
            }
        })?;
        bundle.insert(key, value);
    }

    Ok(bundle)
}

fn parse_single_override(input: &str) -> Result<(String, Value), String> {
    let Some((key, value)) = input.split_once('=') else {
        return Err("expected KEY=VALUE".to_string());
    };

    let key = key.trim();
    if key.is_empty() {
        return Err("empty key".to_string());
    }
    if key.chars().any(char::is_whitespace) {
        return Err("key must not contain whitespace".to_string());
    }

    let value = value.trim();
    let value = match value {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        other => match other.parse::<i64>() {
            Ok(int) => Value::Int(int),
            Err(_) => Value::String(other.to_string()),
        },
    };

    Ok((key.to_string(), value))
}
