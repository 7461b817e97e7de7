use crate::types::Provider;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    pub provider: Provider,
    pub connected: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

impl Integration {
    pub fn disconnected(provider: Provider) -> Self {
        Self {
            provider,
            connected: false,
            account_name: None,
            connected_at: None,
        }
    }
}

/// Path of the OAuth redirect, relative to the API base.
pub fn authorize_path(provider: Provider) -> String {
    format!("/oauth/{provider}/authorize")
}

/// One entry per provider, keeping connected entries from `known`.
pub fn merge_with_providers(known: &[Integration]) -> Vec<Integration> {
    Provider::all()
        .iter()
        .map(|p| {
            known
                .iter()
                .find(|i| i.provider == *p)
                .cloned()
                .unwrap_or_else(|| Integration::disconnected(*p))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_path_uses_wire_name() {
        assert_eq!(authorize_path(Provider::Linkedin), "/oauth/linkedin/authorize");
    }

    #[test]
    fn merge_fills_missing_providers() {
        let mut ig = Integration::disconnected(Provider::Instagram);
        ig.connected = true;
        let all = merge_with_providers(&[ig]);
        assert_eq!(all.len(), Provider::all().len());
        assert!(all[0].connected);
        assert!(all[1..].iter().all(|i| !i.connected));
    }
}
