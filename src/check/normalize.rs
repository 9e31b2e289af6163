//! Canonicalization of client-supplied identifiers

/// Character substituted for anything outside the identifier alphabet
const PLACEHOLDER: char = '_';

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_')
}

/// Normalize a free-form identifier.
///
/// Trims surrounding whitespace, lower-cases, and replaces every character
/// outside `[a-z0-9._-]` with `_`. Never fails; blank input yields `""`.
///
/// Examples:
/// - " Darwin-16.1.0 x86_64 " -> "darwin-16.1.0_x86_64"
/// - "3.5.2+ (default)" -> "3.5.2___default_"
pub fn normalize(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .map(|c| if is_identifier_char(c) { c } else { PLACEHOLDER })
        .collect()
}

/// Normalize a reported package name.
///
/// Clients embedded in other projects often report a module path such as
/// `resources.lib.modules.praw`; only the final segment names the
/// distributed package.
pub fn normalize_package_name(raw: &str) -> String {
    let last_segment = raw.rsplit('.').next().unwrap_or(raw);
    normalize(last_segment)
}
