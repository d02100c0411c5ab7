//! Script Manager Profiles - key tables as contracts
//!
//! Each script manager accepts a fixed set of meta keys. Tables are layered:
//! a basic set every manager understands, a cross-manager tier on top of it,
//! then per-manager additions. The compatible profile is the key-wise union,
//! later tables winning on a name collision.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::{Error, Result};
use crate::rules::{Restriction, Rule, ANTIFEATURE, INJECT_INTO, RUN_AT, SANDBOX};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScriptManager {
    Tampermonkey,
    Greasemonkey3,
    Greasemonkey4,
    Violentmonkey,
    /// Union of every manager's keys
    #[default]
    Compatible,
}

impl ScriptManager {
    pub const ALL: [ScriptManager; 5] = [
        ScriptManager::Tampermonkey,
        ScriptManager::Greasemonkey3,
        ScriptManager::Greasemonkey4,
        ScriptManager::Violentmonkey,
        ScriptManager::Compatible,
    ];

    /// Resolve an optional selector; a missing or blank selector means
    /// [`ScriptManager::Compatible`].
    pub fn resolve(selector: Option<&str>) -> Result<Self> {
        selector
            .filter(|s| !s.trim().is_empty())
            .map_or(Ok(Self::Compatible), |s| s.parse())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Tampermonkey => "tampermonkey",
            Self::Greasemonkey3 => "greasemonkey3",
            Self::Greasemonkey4 => "greasemonkey4",
            Self::Violentmonkey => "violentmonkey",
            Self::Compatible => "compatible",
        }
    }

    pub fn table(&self) -> &'static RuleTable {
        match self {
            Self::Tampermonkey => &TAMPERMONKEY,
            Self::Greasemonkey3 => &GREASEMONKEY3,
            Self::Greasemonkey4 => &GREASEMONKEY4,
            Self::Violentmonkey => &VIOLENTMONKEY,
            Self::Compatible => &COMPATIBLE,
        }
    }

    pub fn supports(&self, key: &str) -> bool {
        self.table().contains(key)
    }
}

impl FromStr for ScriptManager {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let selector = s.trim().to_lowercase();
        match selector.as_str() {
            "tm" | "tampermonkey" => Ok(Self::Tampermonkey),
            "gm3" | "greasemonkey3" => Ok(Self::Greasemonkey3),
            "gm" | "gm4" | "greasemonkey" | "greasemonkey4" => Ok(Self::Greasemonkey4),
            "vm" | "violentmonkey" => Ok(Self::Violentmonkey),
            "all" | "compatible" => Ok(Self::Compatible),
            _ => Err(Error::UnknownScriptManager(selector)),
        }
    }
}

impl fmt::Display for ScriptManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered key name to rule bindings. Read-only once built.
#[derive(Debug, Clone)]
pub struct RuleTable {
    bindings: Vec<(&'static str, Rule)>,
}

impl RuleTable {
    fn new(bindings: &[(&'static str, Rule)]) -> Self {
        Self::default().with(bindings)
    }

    /// Copy of `self` with `additions` applied. A redeclared key keeps its
    /// original position and takes the new rule.
    fn with(&self, additions: &[(&'static str, Rule)]) -> Self {
        let mut bindings = self.bindings.clone();
        for &(name, rule) in additions {
            match bindings.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = rule,
                None => bindings.push((name, rule)),
            }
        }
        Self { bindings }
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(|(name, _)| *name)
    }

    pub fn rule_for(&self, name: &str) -> Option<Rule> {
        self.bindings
            .iter()
            .find(|(existing, _)| *existing == name)
            .map(|(_, rule)| *rule)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.rule_for(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self { bindings: vec![] }
    }
}

static BASIC: LazyLock<RuleTable> = LazyLock::new(|| {
    RuleTable::new(&[
        ("name", Rule::Multilingual),
        ("description", Rule::Multilingual),
        ("namespace", Rule::Text),
        ("match", Rule::MatchList),
        ("include", Rule::GlobUriList),
        ("exclude", Rule::GlobUriList),
        ("icon", Rule::Uri),
        ("require", Rule::UriList),
        ("run-at", Rule::Choice(RUN_AT)),
        ("resource", Rule::ResourceMap),
        ("version", Rule::Version),
        ("noframes", Rule::Flag),
        ("grant", Rule::Grant),
        ("antifeature", Rule::TextList(Some(Restriction::OneOf(ANTIFEATURE)))),
    ])
});

static CROSS_MANAGER: LazyLock<RuleTable> = LazyLock::new(|| {
    BASIC.with(&[
        ("updateURL", Rule::Uri),
        ("installURL", Rule::Uri),
        ("downloadURL", Rule::Uri),
        ("license", Rule::Text),
        ("supportURL", Rule::Uri),
        ("contributionURL", Rule::Uri),
        ("contributionAmount", Rule::Text),
        ("compatible", Rule::TextList(None)),
        ("incompatible", Rule::TextList(None)),
    ])
});

static TAMPERMONKEY: LazyLock<RuleTable> = LazyLock::new(|| {
    CROSS_MANAGER.with(&[
        ("author", Rule::Text),
        // If @namespace starts with http:// the manager links it as the homepage too
        ("homepage", Rule::Uri),
        ("homepageURL", Rule::Uri),
        ("website", Rule::Uri),
        ("source", Rule::Uri),
        ("defaulticon", Rule::Uri),
        ("icon64", Rule::Uri),
        ("iconURL", Rule::Uri),
        ("icon64URL", Rule::Uri),
        ("updateURL", Rule::Uri),
        ("downloadURL", Rule::Uri),
        ("supportURL", Rule::Uri),
        ("connect", Rule::ConnectList),
        ("nocompat", Rule::NoCompat),
        ("sandbox", Rule::Choice(SANDBOX)),
        ("unwrap", Rule::Flag),
    ])
});

static GREASEMONKEY3: LazyLock<RuleTable> = LazyLock::new(|| {
    CROSS_MANAGER.with(&[
        ("author", Rule::Text),
        ("installURL", Rule::Uri),
        ("downloadURL", Rule::Uri),
        ("homepageURL", Rule::Uri),
        ("updateURL", Rule::Uri),
    ])
});

static GREASEMONKEY4: LazyLock<RuleTable> = LazyLock::new(|| CROSS_MANAGER.with(&[]));

static VIOLENTMONKEY: LazyLock<RuleTable> = LazyLock::new(|| {
    CROSS_MANAGER.with(&[
        ("exclude-match", Rule::MatchList),
        ("inject-into", Rule::Choice(INJECT_INTO)),
        ("unwrap", Rule::Flag),
    ])
});

static COMPATIBLE: LazyLock<RuleTable> = LazyLock::new(|| {
    [&*GREASEMONKEY3, &*GREASEMONKEY4, &*VIOLENTMONKEY]
        .into_iter()
        .fold(TAMPERMONKEY.clone(), |union, table| union.with(&table.bindings))
});
