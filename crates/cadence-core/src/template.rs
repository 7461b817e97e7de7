use crate::error::{CadenceError, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

static PLACEHOLDER_RE: OnceLock<Regex> = OnceLock::new();

fn placeholder_re() -> &'static Regex {
    PLACEHOLDER_RE.get_or_init(|| Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap())
}

/// Reusable post or message body with `{{variable}}` placeholders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    pub body: String,
}

impl Template {
    /// Distinct placeholder names in order of first appearance.
    pub fn placeholders(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        placeholder_re()
            .captures_iter(&self.body)
            .map(|c| c[1].to_string())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }

    /// Substitute every placeholder. Fails listing all missing names.
    pub fn render(&self, vars: &BTreeMap<String, String>) -> Result<String> {
        let missing: BTreeSet<String> = self
            .placeholders()
            .into_iter()
            .filter(|name| !vars.contains_key(name))
            .collect();
        if !missing.is_empty() {
            let names: Vec<String> = missing.into_iter().collect();
            return Err(CadenceError::MissingVariables(names.join(", ")));
        }
        let rendered = placeholder_re().replace_all(&self.body, |c: &regex::Captures<'_>| {
            vars.get(&c[1]).cloned().unwrap_or_default()
        });
        Ok(rendered.into_owned())
    }
}

/// Parse `key=value` pairs as given on the command line.
pub fn parse_vars<'a>(pairs: impl IntoIterator<Item = &'a str>) -> Result<BTreeMap<String, String>> {
    let mut vars = BTreeMap::new();
    for pair in pairs {
        let (k, v) = pair
            .split_once('=')
            .ok_or_else(|| CadenceError::InvalidVariable(format!("'{pair}' is not key=value")))?;
        vars.insert(k.trim().to_string(), v.to_string());
    }
    Ok(vars)
}
