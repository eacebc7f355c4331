//! Effective-argument resolution for check invocations.
//!
//! Precedence, lowest to highest: registered defaults, the first matching
//! schedule target, user overrides. Defaults are merged *underneath* the
//! schedule kwargs so a scheduled value is never shadowed by an
//! auto-registered one.

use serde_json::Value;

use crate::types::{CheckDefinition, Kwargs};

/// Resolve the kwargs a run of `check` against `environment` should use.
pub fn resolve(check: &CheckDefinition, environment: &str, overrides: &Kwargs) -> Kwargs {
    let mut kwargs = scheduled_kwargs(check, environment).unwrap_or_default();

    for (key, value) in &check.registered_defaults {
        if !kwargs.contains_key(key) {
            kwargs.insert(key.clone(), value.clone());
        }
    }

    for (key, value) in overrides {
        kwargs.insert(key.clone(), value.clone());
    }

    kwargs
}

/// Kwargs of the first schedule target that applies to `environment`.
///
/// Schedule entries are scanned in catalog order and the first entry with a
/// matching target wins outright; later entries are not consulted.
pub fn scheduled_kwargs(check: &CheckDefinition, environment: &str) -> Option<Kwargs> {
    check
        .schedule
        .iter()
        .find_map(|entry| entry.targets.iter().find(|t| t.matches(environment)))
        .map(|target| target.kwargs.clone())
}

/// Parse a `key=value` override.
///
/// The value is read as JSON when it parses (`limit=10`, `primary=true`,
/// `uuids=["a","b"]`) and kept as a plain string otherwise.
pub fn parse_override(raw: &str) -> Option<(String, Value)> {
    let (key, value) = raw.split_once('=')?;
    let key = key.trim();
    if key.is_empty() {
        return None;
    }
    let value = value.trim();
    let parsed =
        serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Some((key.to_string(), parsed))
}
