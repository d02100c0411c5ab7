//! Key ordering around an anchor token
//!
//! ```text
//! [ a,  b,  c, "...", d, e]
//! [-3, -2, -1,     0, 1, 2]
//! ```
//!
//! Keys are stable-sorted by their signed distance from the anchor. Keys the
//! template does not mention sit at distance zero with the anchor, in input
//! order.

use std::collections::HashSet;

use crate::manager::RuleTable;

/// Reserved template token standing for every key not otherwise pinned.
pub const ANCHOR: &str = "...";

/// Built-in tail spliced into every template at the anchor position.
pub const DEFAULT_ORDER: &[&str] = &["name", "description", "namespace", ANCHOR, "grant"];

/// An effective ordering template. Always contains exactly one anchor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOrder {
    tokens: Vec<String>,
    anchor: usize,
}

impl KeyOrder {
    /// Build the effective template from a caller template.
    ///
    /// The built-in tail replaces the caller's first anchor, or is appended
    /// when the caller gave none. Duplicates keep their first occurrence and
    /// tokens that are not keys of `table` are dropped.
    pub fn resolve(template: &[String], table: &RuleTable) -> Self {
        let mut spliced: Vec<&str> = template.iter().map(String::as_str).collect();
        match spliced.iter().position(|t| *t == ANCHOR) {
            Some(i) => {
                spliced.splice(i..=i, DEFAULT_ORDER.iter().copied());
            }
            None => spliced.extend_from_slice(DEFAULT_ORDER),
        }

        let mut seen = HashSet::new();
        let tokens: Vec<String> = spliced
            .into_iter()
            .filter(|t| seen.insert(*t))
            .filter(|t| *t == ANCHOR || table.contains(t))
            .map(str::to_string)
            .collect();

        // The tail always carries an anchor and it is never filtered out.
        let anchor = tokens.iter().position(|t| t == ANCHOR).unwrap_or(tokens.len());
        Self { tokens, anchor }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Signed distance of `key` from the anchor; zero when unlisted.
    pub fn distance(&self, key: &str) -> isize {
        match self.tokens.iter().position(|t| t == key) {
            Some(i) => i as isize - self.anchor as isize,
            None => 0,
        }
    }

    /// Stable sort of `items` by the distance of their key.
    pub fn sort_by<T>(&self, mut items: Vec<T>, key_of: impl Fn(&T) -> &str) -> Vec<T> {
        items.sort_by_key(|item| self.distance(key_of(item)));
        items
    }
}

/// Order `keys` against `template` for the profile described by `table`.
pub fn compute_order(keys: &[&str], template: &[String], table: &RuleTable) -> Vec<String> {
    let order = KeyOrder::resolve(template, table);
    order.sort_by(keys.iter().map(|k| k.to_string()).collect(), |k| k.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::ScriptManager;

    fn template(tokens: &[&str]) -> Vec<String> {
        tokens.iter().map(|t| t.to_string()).collect()
    }

    fn compatible() -> &'static RuleTable {
        ScriptManager::Compatible.table()
    }

    #[test]
    fn test_duplicates_and_unknown_tokens_dropped() {
        let order = KeyOrder::resolve(
            &template(&["name", "...", "not-meta-keys", "...", "grant", "name:zh-TW"]),
            compatible(),
        );
        assert_eq!(order.tokens(), template(&["name", "description", "namespace", "...", "grant"]));
    }

    #[test]
    fn test_missing_anchor_appends_tail() {
        let order = KeyOrder::resolve(&template(&["version"]), compatible());
        assert_eq!(
            order.tokens(),
            template(&["version", "name", "description", "namespace", "...", "grant"])
        );
        assert_eq!(order.distance("version"), -4);
        assert_eq!(order.distance("grant"), 1);
        assert_eq!(order.distance("match"), 0);
    }

    #[test]
    fn test_tokens_after_anchor_follow_tail() {
        let order = KeyOrder::resolve(&template(&["version", "...", "license"]), compatible());
        assert_eq!(
            order.tokens(),
            template(&["version", "name", "description", "namespace", "...", "grant", "license"])
        );
        assert_eq!(order.distance("license"), 2);
    }

    #[test]
    fn test_profile_filters_tokens() {
        let order = KeyOrder::resolve(&template(&["inject-into", "..."]), ScriptManager::Tampermonkey.table());
        assert_eq!(order.distance("inject-into"), 0);
    }

    #[test]
    fn test_stable_sort() {
        let keys = ["match", "grant", "version", "name", "include", "namespace"];
        let sorted = compute_order(&keys, &template(&["version", "..."]), compatible());
        assert_eq!(
            sorted,
            template(&["version", "name", "namespace", "match", "include", "grant"])
        );
    }

    #[test]
    fn test_ordering_is_idempotent() {
        let tmpl = template(&["version", "...", "license"]);
        let keys = ["license", "grant", "match", "name", "version", "include"];
        let once = compute_order(&keys, &tmpl, compatible());
        let refs: Vec<&str> = once.iter().map(String::as_str).collect();
        let twice = compute_order(&refs, &tmpl, compatible());
        assert_eq!(once, twice);
    }

    #[test]
    fn test_anchor_law_with_duplicates() {
        let tmpl = template(&["version", "...", "grant", "...", "grant"]);
        let keys = ["grant", "icon", "version", "match"];
        let sorted = compute_order(&keys, &tmpl, compatible());
        assert_eq!(sorted, template(&["version", "icon", "match", "grant"]));
    }
}
