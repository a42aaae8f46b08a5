//! Identifier grammar shared by plugin names, task labels, and middleware names.

use std::sync::LazyLock;

use regex::Regex;

/// Unanchored identifier pattern: a letter followed by one or more letters,
/// digits, `_` or `-`.
pub const RE_IDENTIFIER: &str = r"[A-Za-z][A-Za-z0-9_\-]+";

/// [`RE_IDENTIFIER`] anchored at both ends.
const RE_IDENTIFIER_ANCHORED: &str = r"^[A-Za-z][A-Za-z0-9_\-]+$";

// Literal pattern, exercised by the tests below.
static VALID_IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(RE_IDENTIFIER_ANCHORED).expect("identifier pattern is valid"));

/// Returns `true` if `s` matches the identifier grammar.
///
/// # Example
/// ```
/// use taskhost::is_identifier;
///
/// assert!(is_identifier("nginx-gateway"));
/// assert!(!is_identifier("00label"));
/// ```
pub fn is_identifier(s: &str) -> bool {
    VALID_IDENTIFIER.is_match(s)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anchored_pattern_matches_public_one() {
        assert_eq!(RE_IDENTIFIER_ANCHORED, format!("^{RE_IDENTIFIER}$"));
        assert_eq!(VALID_IDENTIFIER.as_str(), RE_IDENTIFIER_ANCHORED);
    }

    #[test]
    fn test_valid_identifiers() {
        for s in ["router", "token-auth", "nginx_gateway", "a1", "Label-00", "ab"] {
            assert!(is_identifier(s), "{s:?} should be valid");
        }
    }

    #[test]
    fn test_invalid_identifiers() {
        for s in ["", "a", "00label", "label 00", "label.00", "-lead", "_lead", "lab/el"] {
            assert!(!is_identifier(s), "{s:?} should be invalid");
        }
    }
}
