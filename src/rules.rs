//! Rule System - one variant per value shape
//!
//! A [`Rule`] is plain data; [`Rule::apply`] is the single interpreter that
//! turns a normalized meta value into rendered entries. Every check reports
//! through the [`Reporter`], which decides whether a violation is dropped,
//! recorded, or fatal.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;
use crate::validation::{Reporter, Violation, ViolationKind};
use crate::validators::{
    clean_version, coerce_version, is_connect_target, is_falsy, is_glob_uri, is_match_pattern,
    is_uri, value_text,
};
use crate::DEFAULT_GRANT;

pub const RUN_AT: &[&str] = &[
    "document-end",
    "document-start",
    "document-idle",
    "document-body",
    "context-menu",
];

pub const INJECT_INTO: &[&str] = &["page", "content", "auto"];

pub const SANDBOX: &[&str] = &["raw", "JavaScript", "DOM"];

pub const ANTIFEATURE: &[&str] = &["ads", "tracking", "miner"];

/// One rendered line of the block: a key plus zero, one, or two value parts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaEntry {
    pub key: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl MetaEntry {
    pub fn pair(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: vec![value.into()],
        }
    }

    pub fn triple(key: impl Into<String>, sub_key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: vec![sub_key.into(), value.into()],
        }
    }

    pub fn flag(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            values: vec![],
        }
    }
}

/// `None` means the value produced nothing renderable.
pub type RuleOutput = Result<Option<Vec<MetaEntry>>>;

/// Extra per-item check for string lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Restriction {
    OneOf(&'static [&'static str]),
}

impl Restriction {
    fn allows(&self, item: &str) -> bool {
        match self {
            Restriction::OneOf(allowed) => allowed.contains(&item),
        }
    }

    fn violation(&self, key: &str, item: &str) -> Violation {
        match self {
            Restriction::OneOf(allowed) => {
                let set = allowed.join(", ");
                Violation::invalid(key, format!("{key}'s metaValue should be one of [{set}]"))
                    .expected(set)
                    .actual(item)
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Text, or a map with a required `default` plus per-language variants
    Multilingual,
    Text,
    TextList(Option<Restriction>),
    Uri,
    UriList,
    GlobUri,
    GlobUriList,
    /// Fixed ordered set; the first member is the fallback
    Choice(&'static [&'static str]),
    /// Name to URI map, one `key name uri` entry per pair
    ResourceMap,
    Version,
    /// Presence only
    Flag,
    MatchList,
    ConnectList,
    NoCompat,
    Grant,
}

impl Rule {
    /// Apply this rule to `value` under `key`. `value` is `None` when the key
    /// was given no value at all.
    pub fn apply(&self, key: &str, value: Option<&Value>, reporter: &mut Reporter) -> RuleOutput {
        match self {
            Rule::Choice(set) => choice(key, value, *set, reporter),
            Rule::Grant => grant(key, value, reporter),
            Rule::NoCompat => no_compat(key, value, reporter),
            Rule::Multilingual => require_truthy(key, value, reporter, |v, r| multilingual(key, v, r)),
            Rule::Text => require_truthy(key, value, reporter, |v, r| Ok(text(key, v, r)?.map(|e| vec![e]))),
            Rule::TextList(restriction) => {
                require_truthy(key, value, reporter, |v, r| text_list(key, v, *restriction, r))
            }
            Rule::Uri => require_truthy(key, value, reporter, |v, r| Ok(uri(key, v, r)?.map(|e| vec![e]))),
            Rule::UriList => require_truthy(key, value, reporter, |v, r| list_of(key, v, r, uri)),
            Rule::GlobUri => {
                require_truthy(key, value, reporter, |v, r| Ok(glob_uri(key, v, r)?.map(|e| vec![e])))
            }
            Rule::GlobUriList => require_truthy(key, value, reporter, |v, r| list_of(key, v, r, glob_uri)),
            Rule::ResourceMap => require_truthy(key, value, reporter, |v, r| resource_map(key, v, r)),
            Rule::Version => require_truthy(key, value, reporter, |v, r| version(key, v, r)),
            Rule::Flag => require_truthy(key, value, reporter, |_, _| Ok(Some(vec![MetaEntry::flag(key)]))),
            Rule::MatchList => require_truthy(key, value, reporter, |v, r| match_list(key, v, r)),
            Rule::ConnectList => require_truthy(key, value, reporter, |v, r| connect_list(key, v, r)),
        }
    }
}

/// Report a missing or falsy value; otherwise hand it to `then`.
fn require_truthy(
    key: &str,
    value: Option<&Value>,
    reporter: &mut Reporter,
    then: impl FnOnce(&Value, &mut Reporter) -> RuleOutput,
) -> RuleOutput {
    match value {
        Some(v) if !is_falsy(v) => then(v, reporter),
        _ => report_none(reporter, falsy(key)),
    }
}

fn falsy(key: &str) -> Violation {
    Violation::invalid(key, format!("{key}'s metaValue can't be falsy"))
}

fn wrong_type(key: &str, expected: &str) -> Violation {
    Violation::invalid(key, format!("{key}'s metaValue should be {expected} type")).expected(expected)
}

fn report_none<T>(reporter: &mut Reporter, violation: Violation) -> Result<Option<T>> {
    reporter.report(violation)?;
    Ok(None)
}

fn non_empty(entries: Vec<MetaEntry>) -> Option<Vec<MetaEntry>> {
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

fn multilingual(key: &str, value: &Value, reporter: &mut Reporter) -> RuleOutput {
    let map = match value {
        Value::String(s) => return Ok(Some(vec![MetaEntry::pair(key, s.as_str())])),
        Value::Object(map) => map,
        _ => {
            return report_none(
                reporter,
                Violation::invalid(key, format!("{key}'s metaValue is an invalid type")),
            )
        }
    };

    let default = match map.get("default") {
        Some(Value::String(s)) if !s.is_empty() => s,
        _ => {
            return report_none(
                reporter,
                Violation::new(key, ViolationKind::MissingDefault, format!("{key}.default is required")),
            )
        }
    };

    let mut entries = vec![MetaEntry::pair(key, default.as_str())];
    for (lang, text) in map.iter().filter(|(lang, _)| lang.as_str() != "default") {
        let localized = format!("{key}:{lang}");
        match text {
            Value::String(s) => entries.push(MetaEntry::pair(localized, s.as_str())),
            _ => reporter.report(wrong_type(&localized, "string"))?,
        }
    }
    Ok(Some(entries))
}

/// A single string item. Falsy and non-string items report and yield nothing.
fn text(key: &str, value: &Value, reporter: &mut Reporter) -> Result<Option<MetaEntry>> {
    match value {
        v if is_falsy(v) => report_none(reporter, falsy(key)),
        Value::String(s) => Ok(Some(MetaEntry::pair(key, s.as_str()))),
        _ => report_none(reporter, wrong_type(key, "string")),
    }
}

fn text_list(
    key: &str,
    value: &Value,
    restriction: Option<Restriction>,
    reporter: &mut Reporter,
) -> RuleOutput {
    let check = |item: &str, reporter: &mut Reporter| -> Result<()> {
        match restriction {
            Some(r) if !r.allows(item) => reporter.report(r.violation(key, item)),
            _ => Ok(()),
        }
    };

    match value {
        Value::String(s) => {
            check(s.as_str(), reporter)?;
            Ok(text(key, value, reporter)?.map(|e| vec![e]))
        }
        Value::Array(items) if items.is_empty() => report_none(reporter, empty_list(key)),
        Value::Array(items) => {
            let mut entries = vec![];
            for item in items {
                if let Some(entry) = text(key, item, reporter)? {
                    check(entry.values[0].as_str(), reporter)?;
                    entries.push(entry);
                }
            }
            Ok(non_empty(entries))
        }
        _ => report_none(reporter, wrong_type(key, "string or string[]")),
    }
}

fn empty_list(key: &str) -> Violation {
    Violation::invalid(key, format!("{key}'s metaValue can't be an empty list"))
}

fn uri(key: &str, value: &Value, reporter: &mut Reporter) -> Result<Option<MetaEntry>> {
    match value {
        v if is_falsy(v) => report_none(reporter, falsy(key)),
        Value::String(s) => {
            if !is_uri(s) {
                reporter.report(
                    Violation::invalid(key, format!("{key}'s metaValue should be a valid URI"))
                        .expected("absolute URI")
                        .actual(s.as_str()),
                )?;
            }
            Ok(Some(MetaEntry::pair(key, s.as_str())))
        }
        _ => report_none(reporter, wrong_type(key, "string")),
    }
}

fn glob_uri(key: &str, value: &Value, reporter: &mut Reporter) -> Result<Option<MetaEntry>> {
    match value {
        Value::String(s) if is_glob_uri(s) => Ok(Some(MetaEntry::pair(key, s.as_str()))),
        Value::String(_) => uri(key, value, reporter),
        v if is_falsy(v) => report_none(reporter, falsy(key)),
        _ => report_none(reporter, wrong_type(key, "glob uri string")),
    }
}

/// Shared shape for "one item or a list of items" rules.
fn list_of(
    key: &str,
    value: &Value,
    reporter: &mut Reporter,
    item_rule: fn(&str, &Value, &mut Reporter) -> Result<Option<MetaEntry>>,
) -> RuleOutput {
    match value {
        Value::String(_) => Ok(item_rule(key, value, reporter)?.map(|e| vec![e])),
        Value::Array(items) if items.is_empty() => report_none(reporter, empty_list(key)),
        Value::Array(items) => {
            let mut entries = vec![];
            for item in items {
                if let Some(entry) = item_rule(key, item, reporter)? {
                    entries.push(entry);
                }
            }
            Ok(non_empty(entries))
        }
        _ => report_none(reporter, wrong_type(key, "string or string[]")),
    }
}

fn choice(
    key: &str,
    value: Option<&Value>,
    set: &'static [&'static str],
    reporter: &mut Reporter,
) -> RuleOutput {
    let Some(value) = value else {
        return report_none(
            reporter,
            Violation::invalid(key, format!("{key}'s metaValue can't be undefined")),
        );
    };

    if let Value::String(s) = value {
        if set.contains(&s.as_str()) {
            return Ok(Some(vec![MetaEntry::pair(key, s.as_str())]));
        }
    }

    let joined = set.join(", ");
    reporter.report(
        Violation::invalid(key, format!("{key}'s metaValue should be one of [{joined}]"))
            .expected(joined.as_str())
            .actual(value_text(value)),
    )?;

    let Some(first) = set.first() else {
        return Ok(None);
    };
    tracing::debug!(key, fallback = *first, "Set default value");
    Ok(Some(vec![MetaEntry::pair(key, *first)]))
}

fn resource_map(key: &str, value: &Value, reporter: &mut Reporter) -> RuleOutput {
    let Value::Object(map) = value else {
        return report_none(reporter, wrong_type(key, "object"));
    };

    let mut entries = Vec::with_capacity(map.len());
    for (name, target) in map {
        let target = value_text(target);
        if !is_uri(&target) {
            reporter.report(
                Violation::invalid(key, format!("{key}.{name} metaValue should be a valid URI"))
                    .expected("absolute URI")
                    .actual(target.as_str()),
            )?;
        }
        entries.push(MetaEntry::triple(key, name.as_str(), target));
    }
    // An empty map is a valid, empty contribution.
    Ok(Some(entries))
}

fn version(key: &str, value: &Value, reporter: &mut Reporter) -> RuleOutput {
    let raw = match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        _ => return report_none(reporter, wrong_type(key, "string")),
    };

    if let Some(cleaned) = clean_version(&raw) {
        return Ok(Some(vec![MetaEntry::pair(key, cleaned)]));
    }

    match coerce_version(&raw) {
        Some(coerced) => {
            let coerced = coerced.to_string();
            reporter.report(
                Violation::new(key, ViolationKind::Coerced, format!("{key} can be transform to {coerced}"))
                    .expected(coerced.as_str())
                    .actual(raw),
            )?;
            Ok(Some(vec![MetaEntry::pair(key, coerced)]))
        }
        None => report_none(
            reporter,
            Violation::invalid(key, format!("{key}'s metaValue is invalid")).actual(raw),
        ),
    }
}

fn match_list(key: &str, value: &Value, reporter: &mut Reporter) -> RuleOutput {
    let check = |item: &str, reporter: &mut Reporter| -> Result<MetaEntry> {
        if !is_match_pattern(item) {
            reporter.report(
                Violation::invalid(key, format!("{key}'s metaValue should be a valid match pattern string"))
                    .actual(item),
            )?;
        }
        Ok(MetaEntry::pair(key, item))
    };

    match value {
        Value::String(s) => Ok(Some(vec![check(s.as_str(), reporter)?])),
        Value::Array(items) if items.is_empty() => report_none(reporter, empty_list(key)),
        Value::Array(items) => {
            let mut entries = vec![];
            // Non-string items are skipped.
            for item in items.iter().filter_map(Value::as_str) {
                entries.push(check(item, reporter)?);
            }
            Ok(non_empty(entries))
        }
        _ => report_none(
            reporter,
            wrong_type(key, "match pattern string or match pattern string[]"),
        ),
    }
}

fn string_items(value: &Value) -> Option<Vec<&str>> {
    match value {
        Value::Array(items) if !items.is_empty() => items.iter().map(Value::as_str).collect(),
        _ => None,
    }
}

fn connect_list(key: &str, value: &Value, reporter: &mut Reporter) -> RuleOutput {
    let items = match value {
        Value::String(s) => vec![s.as_str()],
        other => match string_items(other) {
            Some(items) => items,
            None => return report_none(reporter, wrong_type(key, "connect string or connect string[]")),
        },
    };

    let mut entries = Vec::with_capacity(items.len());
    for item in items {
        if !is_connect_target(item) {
            reporter.report(
                Violation::invalid(key, format!("{key}'s metaValue should be a valid connect string"))
                    .actual(item),
            )?;
        }
        entries.push(MetaEntry::pair(key, item));
    }
    Ok(Some(entries))
}

fn no_compat(key: &str, value: Option<&Value>, reporter: &mut Reporter) -> RuleOutput {
    let Some(value) = value.filter(|v| !is_falsy(v)) else {
        return Ok(None);
    };
    if value_text(value).to_lowercase().contains("chrome") {
        return Ok(Some(vec![MetaEntry::pair(key, "Chrome")]));
    }
    report_none(
        reporter,
        Violation::invalid(key, format!("{key}'s metaValue should be 'chrome'")).expected("chrome"),
    )
}

fn grant(key: &str, value: Option<&Value>, reporter: &mut Reporter) -> RuleOutput {
    let value = match value {
        Some(v) if !is_falsy(v) => v,
        _ => return Ok(Some(vec![MetaEntry::pair(key, DEFAULT_GRANT)])),
    };

    if let Value::String(s) = value {
        return Ok(Some(vec![MetaEntry::pair(key, s.as_str())]));
    }
    match string_items(value) {
        Some(items) => Ok(Some(items.into_iter().map(|g| MetaEntry::pair(key, g)).collect())),
        None => report_none(reporter, wrong_type(key, "grant string or grant string[]")),
    }
}
