//! Standard release vs pre-release classification

use std::sync::LazyLock;

use regex::Regex;

static STANDARD_RELEASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[0-9]+\.[0-9]+(\.[0-9]+)?$").expect("standard release pattern is valid")
});

/// Returns true when `version` is a plain `MAJOR.MINOR[.PATCH]` release.
///
/// Anything carrying a qualifier (`3.0b1`, `4.0.0rc3`, `1.0.dev0`) or any
/// other noise is treated as a pre-release, so an unparseable version widens
/// the lookup to the pre-release channel instead of hiding newer candidates.
pub fn is_standard_release(version: &str) -> bool {
    STANDARD_RELEASE.is_match(version.trim())
}
