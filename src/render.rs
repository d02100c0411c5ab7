//! Block rendering
//!
//! Entries become `// @key value` lines between the two sentinels. Column
//! widths are measured per bucket (`name*`, `description*`, everything else)
//! and merged when the localized variants are absent.

use regex::Regex;
use std::sync::LazyLock;

use crate::rules::MetaEntry;

pub const BLOCK_START: &str = "// ==UserScript==";
pub const BLOCK_END: &str = "// ==/UserScript==";

static NAME_KEY: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^name(:.+)?$").unwrap());
static DESCRIPTION_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^description(:.+)?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Name,
    Description,
    Other,
}

impl Bucket {
    fn of(key: &str) -> Self {
        if NAME_KEY.is_match(key) {
            Bucket::Name
        } else if DESCRIPTION_KEY.is_match(key) {
            Bucket::Description
        } else {
            Bucket::Other
        }
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Widths {
    name: usize,
    description: usize,
    other: usize,
}

impl Widths {
    fn measure(entries: &[MetaEntry]) -> Self {
        let mut widths = Self::default();
        for entry in entries {
            let len = entry.key.chars().count();
            let slot = match Bucket::of(&entry.key) {
                Bucket::Name => &mut widths.name,
                Bucket::Description => &mut widths.description,
                Bucket::Other => &mut widths.other,
            };
            *slot = (*slot).max(len);
        }

        let plain_name = widths.name == "name".len();
        let plain_description = widths.description == "description".len();
        match (plain_name, plain_description) {
            (true, true) => {
                let max = widths.name.max(widths.description).max(widths.other);
                widths = Self { name: max, description: max, other: max };
            }
            (true, false) => {
                let max = widths.name.max(widths.other);
                widths.name = max;
                widths.other = max;
            }
            (false, true) => {
                let max = widths.description.max(widths.other);
                widths.description = max;
                widths.other = max;
            }
            (false, false) => {}
        }
        widths
    }

    fn of(&self, bucket: Bucket) -> usize {
        match bucket {
            Bucket::Name => self.name,
            Bucket::Description => self.description,
            Bucket::Other => self.other,
        }
    }
}

fn line(entry: &MetaEntry, width: usize) -> String {
    let line = format!("// @{:<width$} {}", entry.key, entry.values.join(" "));
    line.trim_end().to_string()
}

/// Render entries as a sentinel-wrapped block. No trailing newline.
pub fn render(entries: &[MetaEntry]) -> String {
    let widths = Widths::measure(entries);

    let mut lines = Vec::with_capacity(entries.len() + 2);
    lines.push(BLOCK_START.to_string());
    for entry in entries {
        lines.push(line(entry, widths.of(Bucket::of(&entry.key))));
    }
    lines.push(BLOCK_END.to_string());

    lines.join("\n")
}
