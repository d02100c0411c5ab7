//! Meta file loading
//!
//! Reads a meta mapping from `.json`, `.yaml`/`.yml`, or `.toml` and lays it
//! over the baseline defaults. Keys from the file replace defaults in place,
//! so the defaults keep their leading position.

use serde_json::Value;
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::{MetaMap, DEFAULT_GRANT, DEFAULT_NAME, DEFAULT_NAMESPACE};

/// Meta file used by the CLI when none is named.
pub const DEFAULT_META_FILE: &str = "metablock.json";

/// The smallest valid meta mapping.
pub fn baseline_meta() -> MetaMap {
    let mut meta = MetaMap::new();
    meta.insert("name".into(), Value::from(DEFAULT_NAME));
    meta.insert("namespace".into(), Value::from(DEFAULT_NAMESPACE));
    meta.insert("grant".into(), Value::from(DEFAULT_GRANT));
    meta
}

/// Load `path` over the baseline defaults. `None` or an empty path yields the
/// defaults alone.
pub fn load_file(path: Option<&Path>) -> Result<MetaMap> {
    let mut meta = baseline_meta();
    let Some(path) = path.filter(|p| !p.as_os_str().is_empty()) else {
        tracing::debug!("no meta file given, using defaults");
        return Ok(meta);
    };

    if !path.exists() {
        return Err(Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_lowercase();
    let content = fs::read_to_string(path)?;
    let parsed: Value = match ext.as_str() {
        "json" => serde_json::from_str(&content)?,
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "toml" => toml::from_str(&content)?,
        _ => return Err(Error::UnsupportedFormat { ext: format!(".{ext}") }),
    };

    // An empty document contributes nothing.
    let loaded = match parsed {
        Value::Object(map) => map,
        Value::Null => MetaMap::new(),
        _ => {
            return Err(Error::NotAMapping {
                path: path.to_path_buf(),
            })
        }
    };
    tracing::debug!(path = %path.display(), keys = loaded.len(), "loaded meta file");

    meta.extend(loaded);
    Ok(meta)
}
