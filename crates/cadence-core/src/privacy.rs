use crate::types::{JobStatus, PrivacyJobKind};
use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub const MIN_RETENTION_DAYS: u32 = 1;
pub const MAX_RETENTION_DAYS: u32 = 3650;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetentionPolicy {
    pub retention_days: u32,
    #[serde(default)]
    pub auto_delete: bool,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            retention_days: 365,
            auto_delete: false,
        }
    }
}

impl RetentionPolicy {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if !(MIN_RETENTION_DAYS..=MAX_RETENTION_DAYS).contains(&self.retention_days) {
            errors.add(
                "retention_days",
                format!("Retention must be between {MIN_RETENTION_DAYS} and {MAX_RETENTION_DAYS} days"),
            );
        }
        errors
    }
}

/// Body of `/privacy/export` and `/privacy/delete`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyRequest {
    /// Email or account id of the data subject.
    pub subject: String,
    /// Deletion must be confirmed explicitly.
    #[serde(default)]
    pub confirm: bool,
}

impl PrivacyRequest {
    pub fn validate(&self, kind: PrivacyJobKind) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require("subject", &self.subject, "Subject is required");
        if kind == PrivacyJobKind::Delete && !self.confirm {
            errors.add("confirm", "Deletion must be confirmed");
        }
        errors
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrivacyJob {
    pub id: String,
    pub kind: PrivacyJobKind,
    pub status: JobStatus,
    pub subject: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_bounds() {
        assert!(RetentionPolicy::default().validate().is_empty());
        for days in [0, 3651] {
            let p = RetentionPolicy {
                retention_days: days,
                auto_delete: true,
            };
            assert!(p.validate().contains("retention_days"), "{days} should be rejected");
        }
        let edge = RetentionPolicy {
            retention_days: 3650,
            auto_delete: false,
        };
        assert!(edge.validate().is_empty());
    }

    #[test]
    fn delete_requires_confirmation() {
        let req = PrivacyRequest {
            subject: "ana@example.com".into(),
            confirm: false,
        };
        assert!(req.validate(PrivacyJobKind::Export).is_empty());
        assert!(req.validate(PrivacyJobKind::Delete).contains("confirm"));
    }
}
