//! Validation System - Rule/Policy Separation
//!
//! Rules produce structured violations.
//! Policy maps violations to actions.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How invalid input is handled. Threaded explicitly into every rule call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorPolicy {
    /// Drop invalid values without feedback
    #[serde(rename = "off")]
    Silent,
    /// Record a diagnostic and keep going with a best-effort result
    #[default]
    #[serde(rename = "warn")]
    Warn,
    /// Abort on the first invalid condition
    #[serde(rename = "error")]
    Strict,
}

impl ErrorPolicy {
    /// Resolve a selector string. Unrecognized or missing selectors fall back
    /// to [`ErrorPolicy::Warn`]; this never fails.
    pub fn resolve(selector: Option<&str>) -> Self {
        match selector.map(|s| s.trim().to_lowercase()).as_deref() {
            Some("off") => Self::Silent,
            Some("error") => Self::Strict,
            _ => Self::Warn,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Silent => "off",
            Self::Warn => "warn",
            Self::Strict => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Key is not supported by the active script manager
    UnknownKey,
    /// Value failed a rule's shape or content check
    InvalidValue,
    /// Multilingual map without its `default` entry
    MissingDefault,
    /// Value was usable only after coercion
    Coerced,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Violation {
    pub key: String,
    pub kind: ViolationKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual: Option<String>,
}

impl Violation {
    pub fn new(key: impl Into<String>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            kind,
            message: message.into(),
            expected: None,
            actual: None,
        }
    }

    pub fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(key, ViolationKind::InvalidValue, message)
    }

    pub fn expected(mut self, expected: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self
    }

    pub fn actual(mut self, actual: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self
    }

    fn into_error(self, manager: &str) -> Error {
        match self.kind {
            ViolationKind::UnknownKey => Error::UnknownMetaKey {
                key: self.key,
                manager: manager.to_string(),
            },
            _ => Error::InvalidMetaValue {
                key: self.key,
                message: self.message,
            },
        }
    }
}

/// Applies an [`ErrorPolicy`] to violations as rules report them.
///
/// Under `Warn` the violations are kept and handed back to the caller
/// alongside the generated block.
#[derive(Debug)]
pub struct Reporter {
    policy: ErrorPolicy,
    manager: String,
    violations: Vec<Violation>,
}

impl Reporter {
    pub fn new(policy: ErrorPolicy) -> Self {
        Self::for_manager(policy, "compatible")
    }

    pub fn for_manager(policy: ErrorPolicy, manager: impl Into<String>) -> Self {
        Self {
            policy,
            manager: manager.into(),
            violations: vec![],
        }
    }

    pub fn report(&mut self, violation: Violation) -> Result<()> {
        match self.policy {
            ErrorPolicy::Silent => Ok(()),
            ErrorPolicy::Warn => {
                tracing::warn!(key = %violation.key, kind = ?violation.kind, "{}", violation.message);
                self.violations.push(violation);
                Ok(())
            }
            ErrorPolicy::Strict => Err(violation.into_error(&self.manager)),
        }
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    pub fn into_violations(self) -> Vec<Violation> {
        self.violations
    }
}
