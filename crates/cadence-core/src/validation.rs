use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Field-keyed validation messages, rendered inline next to each input.
///
/// Keys are field paths such as `name`, `conditions[0].field` or
/// `variants[2].traffic_percentage`. Only the first message per key is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.0.entry(key.into()).or_insert_with(|| message.into());
    }

    /// Record `message` under `key` when `value` is blank.
    pub fn require(&mut self, key: &str, value: &str, message: &str) {
        if value.trim().is_empty() {
            self.add(key, message);
        }
    }

    /// Merge `other` into `self`, prefixing each key with `prefix`.
    pub fn merge_prefixed(&mut self, prefix: &str, other: ValidationErrors) {
        for (k, v) in other.0 {
            self.add(format!("{prefix}.{k}"), v);
        }
    }

    pub fn extend(&mut self, other: ValidationErrors) {
        for (k, v) in other.0 {
            self.add(k, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// `Ok(())` when empty, otherwise the errors wrapped as `CadenceError::Validation`.
    pub fn into_result(self) -> crate::Result<()> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(crate::CadenceError::Validation(self))
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|(k, v)| format!("{k}: {v}")).collect();
        f.write_str(&parts.join("; "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_message_per_key_wins() {
        let mut errors = ValidationErrors::new();
        errors.add("name", "Name is required");
        errors.add("name", "Name is too long");
        assert_eq!(errors.get("name"), Some("Name is required"));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn require_flags_blank_values() {
        let mut errors = ValidationErrors::new();
        errors.require("name", "   ", "Name is required");
        errors.require("description", "ok", "Description is required");
        assert!(errors.contains("name"));
        assert!(!errors.contains("description"));
    }

    #[test]
    fn merge_prefixed_nests_keys() {
        let mut inner = ValidationErrors::new();
        inner.add("url", "URL is required");
        let mut outer = ValidationErrors::new();
        outer.merge_prefixed("steps[1]", inner);
        assert_eq!(outer.get("steps[1].url"), Some("URL is required"));
    }

    #[test]
    fn into_result_wraps_errors() {
        assert!(ValidationErrors::new().into_result().is_ok());
        let mut errors = ValidationErrors::new();
        errors.add("actions", "At least one action is required");
        let err = errors.into_result().unwrap_err();
        assert!(err.to_string().contains("actions: At least one action is required"));
    }
}
