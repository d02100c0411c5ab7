//! Generation Pipeline - Single Entry Point
//!
//! defaults -> override -> key filtering -> ordering -> per-key rules -> render.
//! Every value goes through [`resolve_entry`]; there is no other path from a
//! meta mapping to rendered lines.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

use crate::error::Result;
use crate::loader::load_file;
use crate::manager::ScriptManager;
use crate::order::KeyOrder;
use crate::render::render;
use crate::rules::MetaEntry;
use crate::validation::{ErrorPolicy, Reporter, Violation, ViolationKind};
use crate::{MetaMap, DEFAULT_GRANT, DEFAULT_NAME, DEFAULT_NAMESPACE};

/// Caller-facing options, as a host would hand them over.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Options {
    /// Meta file to load; `None` means baseline defaults only
    #[serde(default)]
    pub file: Option<PathBuf>,
    #[serde(default)]
    pub manager: Option<String>,
    #[serde(default)]
    pub validator: Option<String>,
    #[serde(default)]
    pub order: Option<Vec<String>>,
    /// Merged over the loaded meta, winning on collision
    #[serde(default, rename = "override")]
    pub overrides: Option<MetaMap>,
}

/// Options after selector resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub manager: ScriptManager,
    pub policy: ErrorPolicy,
    pub order: Vec<String>,
}

impl Settings {
    pub fn resolve(options: &Options) -> Result<Self> {
        Ok(Self {
            manager: ScriptManager::resolve(options.manager.as_deref())?,
            policy: ErrorPolicy::resolve(options.validator.as_deref()),
            order: options.order.clone().unwrap_or_default(),
        })
    }
}

/// Baseline value for the keys that always render.
pub fn default_meta(key: &str) -> Option<&'static str> {
    match key {
        "name" => Some(DEFAULT_NAME),
        "namespace" => Some(DEFAULT_NAMESPACE),
        "grant" => Some(DEFAULT_GRANT),
        _ => None,
    }
}

/// Trim strings, string lists, and the string values of a map. Nothing
/// deeper is touched.
pub fn normalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.trim().to_string()),
        Value::Array(items) if !items.is_empty() && items.iter().all(Value::is_string) => items
            .iter()
            .map(|item| Value::String(item.as_str().unwrap_or_default().trim().to_string()))
            .collect(),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| match v {
                    Value::String(s) => (k.clone(), Value::String(s.trim().to_string())),
                    other => (k.clone(), other.clone()),
                })
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Resolve one `(key, value)` pair into rendered entries for `manager`.
pub fn resolve_entry(
    key: &str,
    value: &Value,
    manager: ScriptManager,
    reporter: &mut Reporter,
) -> Result<Option<Vec<MetaEntry>>> {
    let key = key.trim();
    let Some(rule) = manager.table().rule_for(key) else {
        reporter.report(Violation::new(
            key,
            ViolationKind::UnknownKey,
            format!("The script manager doesn't support metaKey: {key}"),
        ))?;
        return Ok(None);
    };

    let value = normalize(value);
    let result = rule.apply(key, Some(&value), reporter)?;
    tracing::trace!(key, ?rule, ?result, "resolved meta key");

    match (result, default_meta(key)) {
        (Some(entries), _) if !entries.is_empty() => Ok(Some(entries)),
        (_, Some(default)) => Ok(Some(vec![MetaEntry::pair(key, default)])),
        (result, None) => Ok(result),
    }
}

/// Output of one generation run.
#[derive(Debug, Clone, Serialize)]
pub struct CompiledBlock {
    pub manager: ScriptManager,
    pub policy: ErrorPolicy,
    pub entries: Vec<MetaEntry>,
    /// Warnings recorded under [`ErrorPolicy::Warn`]; empty otherwise
    pub violations: Vec<Violation>,
    pub text: String,
}

impl CompiledBlock {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Prepend the block to a script body.
    pub fn insert_into(&self, code: &str) -> String {
        insert_block(&self.text, code)
    }
}

/// Block, a blank line, then the code, with trailing newlines trimmed.
pub fn insert_block(block: &str, code: &str) -> String {
    let mut combined = format!("{block}\n\n{code}");
    let trimmed = combined.trim_end_matches('\n').len();
    combined.truncate(trimmed);
    combined
}

/// The generation pipeline for one resolved set of settings.
pub struct Pipeline {
    settings: Settings,
}

impl Pipeline {
    pub fn new(settings: Settings) -> Self {
        Self { settings }
    }

    /// Drop keys no script manager knows, then order what is left.
    pub fn prepare(&self, meta: MetaMap) -> Vec<(String, Value)> {
        let known = ScriptManager::Compatible.table();
        let kept: Vec<(String, Value)> = meta
            .into_iter()
            .filter(|(key, _)| {
                let keep = known.contains(key.trim());
                if !keep {
                    tracing::debug!(key = %key, "dropping unknown meta key");
                }
                keep
            })
            .collect();

        let order = KeyOrder::resolve(&self.settings.order, self.settings.manager.table());
        tracing::debug!(order = ?order.tokens(), "effective order");
        order.sort_by(kept, |(key, _)| key.trim())
    }

    pub fn compile(&self, meta: MetaMap) -> Result<CompiledBlock> {
        let Settings { manager, policy, .. } = self.settings;
        tracing::debug!(%manager, policy = policy.as_str(), "compiling metablock");

        let mut reporter = Reporter::for_manager(policy, manager.as_str());
        let mut entries = vec![];
        for (key, value) in self.prepare(meta) {
            if let Some(resolved) = resolve_entry(&key, &value, manager, &mut reporter)? {
                entries.extend(resolved);
            }
        }
        tracing::debug!(count = entries.len(), "resolved entries");

        let text = render(&entries);
        Ok(CompiledBlock {
            manager,
            policy,
            entries,
            violations: reporter.into_violations(),
            text,
        })
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

/// Load, merge, validate, order, and render in one call.
pub fn generate(options: &Options) -> Result<CompiledBlock> {
    let settings = Settings::resolve(options)?;
    let mut meta = load_file(options.file.as_deref())?;
    if let Some(overrides) = &options.overrides {
        meta.extend(overrides.clone());
    }
    Pipeline::new(settings).compile(meta)
}
