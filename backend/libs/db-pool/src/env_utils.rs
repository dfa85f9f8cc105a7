//! Environment variable parsing helpers shared by service configs.

use std::str::FromStr;

/// Parse `key`, falling back to `default` when missing or unparsable.
pub fn parse_env_with_default<T: FromStr>(key: &str, default: T) -> T {
    parse_env_optional(key).unwrap_or(default)
}

/// Parse `key`, returning `None` when missing or unparsable.
pub fn parse_env_optional<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse().ok())
}

/// Read a comma separated list, dropping blank entries.
///
/// Returns `None` if the variable is unset so callers can apply their own default.
pub fn parse_env_list(key: &str) -> Option<Vec<String>> {
    std::env::var(key).ok().map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
}
