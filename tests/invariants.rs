//! Contract Invariant Tests
//!
//! These tests verify the end-to-end guarantees of `generate`.

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::fs;
use tempfile::TempDir;

use userscript_metablock::{
    generate, pipeline::Pipeline, pipeline::Settings, Error, ErrorPolicy, MetaMap, Options,
    ScriptManager, ViolationKind, DEFAULT_NAMESPACE,
};

fn meta(value: Value) -> MetaMap {
    match value {
        Value::Object(map) => map,
        other => panic!("expected an object, got {other}"),
    }
}

fn options_with(overrides: Value, validator: &str) -> Options {
    Options {
        validator: Some(validator.to_string()),
        overrides: Some(meta(overrides)),
        ..Default::default()
    }
}

fn block(lines: &[&str]) -> String {
    let mut all = vec!["// ==UserScript=="];
    all.extend_from_slice(lines);
    all.push("// ==/UserScript==");
    all.join("\n")
}

#[test]
fn invariant_minimal_block_is_defaults() {
    let compiled = generate(&Options::default()).unwrap();
    assert_eq!(
        compiled.text,
        block(&[
            "// @name      New Script",
            format!("// @namespace {DEFAULT_NAMESPACE}").as_str(),
            "// @grant     none",
        ])
    );
    assert!(compiled.is_clean());
}

#[test]
fn invariant_name_override_keeps_defaults() {
    let compiled = generate(&options_with(json!({"name": "Hello, world"}), "warn")).unwrap();
    assert_eq!(compiled.manager, ScriptManager::Compatible);
    assert_eq!(
        compiled.text,
        block(&[
            "// @name      Hello, world",
            format!("// @namespace {DEFAULT_NAMESPACE}").as_str(),
            "// @grant     none",
        ])
    );
}

#[test]
fn invariant_strict_policy_produces_nothing() {
    let result = generate(&options_with(json!({"run-at": "hello"}), "error"));
    assert!(matches!(result, Err(Error::InvalidMetaValue { ref key, .. }) if key == "run-at"));
}

#[test]
fn invariant_warn_policy_always_produces_block() {
    let compiled = generate(&options_with(
        json!({"run-at": "hello", "version": "1", "name": {"en": "no default"}}),
        "warn",
    ))
    .unwrap();

    assert!(compiled.text.contains("// @run-at    document-end"));
    assert!(compiled.text.contains("// @version   1.0.0"));
    assert!(compiled.text.contains("// @name      New Script"));

    let kinds: Vec<_> = compiled.violations.iter().map(|v| v.kind).collect();
    assert_eq!(
        kinds,
        [ViolationKind::MissingDefault, ViolationKind::InvalidValue, ViolationKind::Coerced]
    );
}

#[test]
fn invariant_silent_policy_records_nothing() {
    let compiled = generate(&options_with(json!({"run-at": "hello"}), "off")).unwrap();
    assert!(compiled.violations.is_empty());
    assert!(compiled.text.contains("@run-at    document-end"));
}

#[test]
fn invariant_empty_resource_map_contributes_nothing() {
    let compiled = generate(&options_with(json!({"resource": {}}), "error")).unwrap();
    assert!(compiled.entries.iter().all(|e| e.key != "resource"));
    assert!(!compiled.text.contains("@resource"));
}

#[test]
fn invariant_unknown_profile_key() {
    let options = Options {
        manager: Some("tm".into()),
        validator: Some("error".into()),
        overrides: Some(meta(json!({"inject-into": "page"}))),
        ..Default::default()
    };
    assert!(matches!(generate(&options), Err(Error::UnknownMetaKey { .. })));

    // Keys no manager knows are filtered before the dispatcher sees them.
    let options = Options {
        validator: Some("error".into()),
        overrides: Some(meta(json!({"flavour": "vanilla"}))),
        ..Default::default()
    };
    assert!(generate(&options).is_ok());
}

#[test]
fn invariant_unknown_manager() {
    let options = Options {
        manager: Some("firemonkey".into()),
        ..Default::default()
    };
    assert!(matches!(generate(&options), Err(Error::UnknownScriptManager(_))));
}

#[test]
fn invariant_blank_manager_is_compatible() {
    let options = Options {
        manager: Some(String::new()),
        ..Default::default()
    };
    assert_eq!(generate(&options).unwrap().manager, ScriptManager::Compatible);
}

#[test]
fn invariant_output_is_deterministic() {
    let options = options_with(
        json!({
            "match": ["https://*.example.com/*", "http://example.org/"],
            "description": {"default": "demo", "zh-TW": "示範"},
            "resource": {"css": "https://cdn.example.com/a.css"},
            "noframes": true,
        }),
        "warn",
    );
    let first = generate(&options).unwrap();
    let second = generate(&options).unwrap();
    assert_eq!(first.text, second.text);
}

#[test]
fn invariant_full_block_layout() {
    let settings = Settings {
        manager: ScriptManager::Tampermonkey,
        policy: ErrorPolicy::Strict,
        order: vec!["version".into(), "...".into(), "license".into()],
    };
    let compiled = Pipeline::new(settings)
        .compile(meta(json!({
            "license": "MIT",
            "grant": ["GM_getValue", "GM_setValue"],
            "match": "https://*.example.com/*",
            "name": {"default": "Demo", "zh-TW": "示範"},
            "description": "An example",
            "namespace": "https://example.com",
            "version": "v2.1.0",
            "resource": {"logo": "https://example.com/logo.png"},
            "connect": ["api.example.com", "localhost"],
            "noframes": true,
        })))
        .unwrap();

    assert_eq!(
        compiled.text,
        block(&[
            "// @version     2.1.0",
            "// @name       Demo",
            "// @name:zh-TW 示範",
            "// @description An example",
            "// @namespace   https://example.com",
            "// @match       https://*.example.com/*",
            "// @resource    logo https://example.com/logo.png",
            "// @connect     api.example.com",
            "// @connect     localhost",
            "// @noframes",
            "// @grant       GM_getValue",
            "// @grant       GM_setValue",
            "// @license     MIT",
        ])
    );
}

#[test]
fn invariant_file_then_override() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("metablock.yaml");
    fs::write(&path, "name: From File\nversion: 1.0.0\nrun-at: document-start\n").unwrap();

    let options = Options {
        file: Some(path),
        overrides: Some(meta(json!({"version": "2.0.0"}))),
        validator: Some("error".into()),
        ..Default::default()
    };
    let compiled = generate(&options).unwrap();
    assert!(compiled.text.contains("// @name      From File"));
    assert!(compiled.text.contains("// @version   2.0.0"));
    assert!(compiled.text.contains("// @run-at    document-start"));
}

#[test]
fn invariant_missing_file_is_config_error() {
    let options = Options {
        file: Some("does/not/exist.json".into()),
        ..Default::default()
    };
    let err = generate(&options).unwrap_err();
    assert!(matches!(err, Error::FileNotFound { .. }));
    assert!(!err.is_policy_failure());
}

#[test]
fn invariant_insert_separates_block_and_code() {
    let compiled = generate(&Options::default()).unwrap();
    let combined = compiled.insert_into("console.log('hi');\n");
    assert!(combined.starts_with("// ==UserScript=="));
    assert!(combined.contains("// ==/UserScript==\n\nconsole.log('hi');"));
    assert!(!combined.ends_with('\n'));
}
