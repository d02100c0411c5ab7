//! Userscript Metablock - metadata block generator
//!
//! # Guarantees
//! 1. Every value passes through its key's rule
//! 2. The error policy is explicit at every rule boundary
//! 3. Deterministic output: same meta, same block
//! 4. Strict policy never produces a partial block

pub mod error;
pub mod validators;
pub mod validation;
pub mod rules;
pub mod manager;
pub mod order;
pub mod render;
pub mod loader;
pub mod pipeline;

pub use error::{Error, Result};
pub use validation::{ErrorPolicy, Reporter, Violation, ViolationKind};
pub use rules::{MetaEntry, Rule};
pub use manager::{RuleTable, ScriptManager};
pub use order::{compute_order, KeyOrder, ANCHOR};
pub use render::render;
pub use loader::load_file;
pub use pipeline::{generate, insert_block, resolve_entry, CompiledBlock, Options, Pipeline, Settings};

/// A parsed meta mapping. Insertion order is preserved.
pub type MetaMap = serde_json::Map<String, serde_json::Value>;

pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_NAME: &str = "New Script";
pub const DEFAULT_NAMESPACE: &str = "crates.io/userscript-metablock";
pub const DEFAULT_GRANT: &str = "none";
