//! Primitive validators
//!
//! Total, side-effect-free predicates over already-narrowed input. Rules in
//! [`crate::rules`] compose these; nothing here knows about error policy.

use regex::Regex;
use semver::{BuildMetadata, Version};
use serde_json::Value;
use std::sync::LazyLock;
use url::Url;

static MATCH_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|https?|file|ftp)://(\*|(?:\*\.)?[^*/]*)/.*$").unwrap()
});

static REGEX_LITERAL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^/.*/$").unwrap());

static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}\.[0-9]{1,3}$").unwrap());

static DOTTED_HOST: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\w-]+(\.[\w-]+)+").unwrap());

static COERCIBLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[^0-9])([0-9]{1,16})(?:\.([0-9]{1,16}))?(?:\.([0-9]{1,16}))?(?:$|[^0-9])")
        .unwrap()
});

/// JavaScript-style falsiness: `null`, `false`, `0`, and `""`.
///
/// Empty lists and empty maps are *not* falsy here; list rules decide on
/// their own how to treat them.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0 || f.is_nan()),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Plain-text form of a value, used where a rule stringifies whatever it was given.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Absolute URI with a scheme and no control characters. No reachability check.
pub fn is_uri(s: &str) -> bool {
    !s.chars().any(char::is_control) && Url::parse(s).is_ok()
}

/// `<scheme>://<host>/<path>` with scheme in `*`, `http`, `https`, `file`, `ftp`
/// and host either `*`, an exact host, or `*.` followed by a suffix.
pub fn is_match_pattern(s: &str) -> bool {
    MATCH_PATTERN.is_match(s)
}

/// Looser than [`is_match_pattern`]: a `/regex/` literal, any well-formed URI,
/// or anything containing a `*`.
pub fn is_glob_uri(s: &str) -> bool {
    REGEX_LITERAL.is_match(s) || is_uri(s) || s.contains('*')
}

pub fn is_ipv4(s: &str) -> bool {
    IPV4.is_match(s) && s.split('.').all(|octet| octet.parse::<u16>().is_ok_and(|n| n <= 255))
}

/// Targets accepted by a connect allow-list entry.
pub fn is_connect_target(s: &str) -> bool {
    is_ipv4(s) || is_uri(s) || DOTTED_HOST.is_match(s) || s == "*" || s == "localhost"
}

/// Strict version parse. Surrounding whitespace and a single leading `v` are
/// tolerated; build metadata is dropped.
pub fn clean_version(s: &str) -> Option<String> {
    let trimmed = s.trim();
    let mut version = Version::parse(trimmed.strip_prefix('v').unwrap_or(trimmed)).ok()?;
    version.build = BuildMetadata::EMPTY;
    Some(version.to_string())
}

/// Extract the first `major[.minor[.patch]]` run from a looser string,
/// e.g. `"1"` becomes `1.0.0` and `"build 2.4"` becomes `2.4.0`.
pub fn coerce_version(s: &str) -> Option<Version> {
    let caps = COERCIBLE.captures(s)?;
    let part = |i: usize| -> Option<u64> {
        match caps.get(i) {
            Some(m) => m.as_str().parse().ok(),
            None => Some(0),
        }
    };
    Some(Version::new(part(1)?, part(2)?, part(3)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_falsy_follows_script_semantics() {
        assert!(is_falsy(&json!(null)));
        assert!(is_falsy(&json!(false)));
        assert!(is_falsy(&json!(0)));
        assert!(is_falsy(&json!("")));
        assert!(!is_falsy(&json!(" ")));
        assert!(!is_falsy(&json!([])));
        assert!(!is_falsy(&json!({})));
        assert!(!is_falsy(&json!(42)));
    }

    #[test]
    fn test_uri() {
        assert!(is_uri("http://example.com/"));
        assert!(is_uri("https://example.com/favicon.ico"));
        assert!(is_uri("data:image/gif;base64,R0lGODdhMAAwAPAAAAAAAP"));
        assert!(!is_uri("http"));
        assert!(!is_uri(""));
        assert!(!is_uri("https://example.com/\u{7}"));
    }

    #[test]
    fn test_bad_match_patterns() {
        for bad in [
            " ",
            "*",
            "http://www.google.com",
            "http://*foo/bar",
            "http://foo.*.bar/baz",
            "http:/bar",
            "foo://*",
        ] {
            assert!(!is_match_pattern(bad), "{bad} should not be a match pattern");
        }
    }

    #[test]
    fn test_good_match_patterns() {
        for good in [
            "http://*/*",
            "http://*/foo*",
            "https://*.google.com/foo*bar",
            "http://example.org/foo/bar.html",
            "file:///foo*",
            "*://mail.google.com/*",
        ] {
            assert!(is_match_pattern(good), "{good} should be a match pattern");
        }
    }

    #[test]
    fn test_glob_uris() {
        assert!(!is_glob_uri(" "));
        assert!(!is_glob_uri(""));
        for good in [
            "*",
            "http://www.google.com",
            "http://*foo/bar",
            "http://foo.*.bar/baz",
            "foo://*",
            "*://mail.google.com/*",
            "/^https?:\\/\\/example\\.com/",
        ] {
            assert!(is_glob_uri(good), "{good} should be a glob uri");
        }
    }

    #[test]
    fn test_ipv4() {
        assert!(is_ipv4("127.0.0.1"));
        assert!(is_ipv4("255.255.255.255"));
        assert!(!is_ipv4("256.0.0.1"));
        assert!(!is_ipv4("1.2.3"));
        assert!(!is_ipv4("a.b.c.d"));
    }

    #[test]
    fn test_connect_targets() {
        assert!(is_connect_target("*"));
        assert!(is_connect_target("localhost"));
        assert!(is_connect_target("api.example.com"));
        assert!(is_connect_target("10.0.0.1"));
        assert!(!is_connect_target("intranet"));
    }

    #[test]
    fn test_clean_version() {
        assert_eq!(clean_version("1.2.3").as_deref(), Some("1.2.3"));
        assert_eq!(clean_version(" v1.2.3 ").as_deref(), Some("1.2.3"));
        assert_eq!(clean_version("1.2.3-beta.1").as_deref(), Some("1.2.3-beta.1"));
        assert_eq!(clean_version("1.2.3+build.5").as_deref(), Some("1.2.3"));
        assert_eq!(clean_version("=1.2.3"), None);
        assert_eq!(clean_version("1"), None);
    }

    #[test]
    fn test_coerce_version() {
        assert_eq!(coerce_version("1"), Some(Version::new(1, 0, 0)));
        assert_eq!(coerce_version("build 2.4"), Some(Version::new(2, 4, 0)));
        assert_eq!(coerce_version("hello.world"), None);
    }
}
