use crate::types::{AbTestStatus, TestType};
use crate::validation::ValidationErrors;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

pub const MIN_VARIANTS: usize = 2;
pub const MAX_VARIANTS: usize = 10;
/// Allowed distance between the summed traffic split and 1.0.
pub const TRAFFIC_TOLERANCE: f64 = 0.01;
// Absorbs binary rounding so a split summing to exactly 0.99 is accepted.
const FLOAT_SLACK: f64 = 1e-9;

// ---------------------------------------------------------------------------
// VariantData
// ---------------------------------------------------------------------------

/// Variant configuration; its kind must match the test's `test_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum VariantData {
    Content {
        caption: String,
        #[serde(default)]
        hashtags: Vec<String>,
        #[serde(default)]
        media_urls: Vec<String>,
    },
    Timing {
        /// Local posting time, `HH:MM`.
        post_time: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weekday: Option<chrono::Weekday>,
    },
    Audience {
        segment: String,
    },
    Creative {
        asset_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
    },
}

impl VariantData {
    pub fn test_type(&self) -> TestType {
        match self {
            VariantData::Content { .. } => TestType::Content,
            VariantData::Timing { .. } => TestType::Timing,
            VariantData::Audience { .. } => TestType::Audience,
            VariantData::Creative { .. } => TestType::Creative,
        }
    }

    fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match self {
            VariantData::Content { caption, .. } => {
                errors.require("caption", caption, "Caption is required")
            }
            VariantData::Timing { post_time, .. } => {
                if NaiveTime::parse_from_str(post_time, "%H:%M").is_err() {
                    errors.add("post_time", "Post time must be HH:MM");
                }
            }
            VariantData::Audience { segment } => {
                errors.require("segment", segment, "Segment is required")
            }
            VariantData::Creative { asset_url, .. } => {
                errors.require("asset_url", asset_url, "Asset URL is required")
            }
        }
        errors
    }
}

// ---------------------------------------------------------------------------
// Variant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// Share of the test's traffic, as a fraction of 1.0.
    pub traffic_percentage: f64,
    #[serde(default)]
    pub is_control: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_data: Option<VariantData>,
}

/// Split checks shared by the wizard and whole-definition validation:
/// 2–10 variants, every share positive, and a total within
/// [`TRAFFIC_TOLERANCE`] of 1.0.
pub fn validate_split(percentages: &[f64]) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    if percentages.len() < MIN_VARIANTS {
        errors.add("variants", format!("At least {MIN_VARIANTS} variants are required"));
    } else if percentages.len() > MAX_VARIANTS {
        errors.add("variants", format!("At most {MAX_VARIANTS} variants are allowed"));
    }
    for (i, pct) in percentages.iter().enumerate() {
        if !(*pct > 0.0) {
            errors.add(
                format!("variants[{i}].traffic_percentage"),
                "Traffic percentage must be greater than 0",
            );
        }
    }
    let total: f64 = percentages.iter().sum();
    if (total - 1.0).abs() > TRAFFIC_TOLERANCE + FLOAT_SLACK {
        errors.add(
            "traffic_split",
            format!("Traffic percentages must sum to 1.0 (currently {total:.3})"),
        );
    }
    errors
}

/// Even split over `n` variants, rounded to three decimals with the
/// remainder on the last variant.
pub fn distribute_evenly(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    let share = (1000 / n) as f64 / 1000.0;
    let mut out = vec![share; n];
    let head: f64 = share * (n - 1) as f64;
    out[n - 1] = ((1.0 - head) * 1000.0).round() / 1000.0;
    out
}

// ---------------------------------------------------------------------------
// Results (display-only)
// ---------------------------------------------------------------------------

/// Pre-computed per-variant outcome reported by the analytics service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantResult {
    pub variant_id: String,
    pub impressions: u64,
    pub conversions: u64,
    #[serde(default)]
    pub p_value: Option<f64>,
    #[serde(default)]
    pub confidence: Option<f64>,
}

impl VariantResult {
    pub fn conversion_rate(&self) -> f64 {
        if self.impressions == 0 {
            0.0
        } else {
            self.conversions as f64 / self.impressions as f64
        }
    }

    pub fn is_significant(&self, alpha: f64) -> bool {
        self.p_value.is_some_and(|p| p < alpha)
    }
}

// ---------------------------------------------------------------------------
// ABTestDefinition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbTestDefinition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    pub hypothesis: String,
    #[serde(default)]
    pub description: String,
    pub test_type: TestType,
    pub variants: Vec<Variant>,
    /// Fraction of the eligible audience enrolled in the test.
    #[serde(default = "default_allocation")]
    pub traffic_allocation: f64,
    #[serde(default = "default_status")]
    pub status: AbTestStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub results: Vec<VariantResult>,
}

fn default_allocation() -> f64 {
    1.0
}

fn default_status() -> AbTestStatus {
    AbTestStatus::Draft
}

impl AbTestDefinition {
    pub fn id_or_empty(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    /// Variant checks: the split rules plus names and data kinds.
    pub fn validate_variants(test_type: TestType, variants: &[Variant]) -> ValidationErrors {
        let pcts: Vec<f64> = variants.iter().map(|v| v.traffic_percentage).collect();
        let mut errors = validate_split(&pcts);
        for (i, v) in variants.iter().enumerate() {
            let key = format!("variants[{i}]");
            errors.require(&format!("{key}.name"), &v.name, "Variant name is required");
            if let Some(data) = &v.variant_data {
                if data.test_type() != test_type {
                    errors.add(
                        format!("{key}.variant_data"),
                        format!("Variant data is {} but the test is {}", data.test_type(), test_type),
                    );
                } else {
                    errors.merge_prefixed(&format!("{key}.variant_data"), data.validate());
                }
            }
        }
        if variants.iter().filter(|v| v.is_control).count() > 1 {
            errors.add("variants", "Only one variant can be the control");
        }
        errors
    }

    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        errors.require("name", &self.name, "Name is required");
        errors.require("hypothesis", &self.hypothesis, "Hypothesis is required");
        if !(self.traffic_allocation > 0.0 && self.traffic_allocation <= 1.0) {
            errors.add("traffic_allocation", "Traffic allocation must be in (0, 1]");
        }
        errors.extend(Self::validate_variants(self.test_type, &self.variants));
        errors
    }

    /// The winning variant among those with significant results, by
    /// conversion rate.
    pub fn leader(&self, alpha: f64) -> Option<&VariantResult> {
        self.results
            .iter()
            .filter(|r| r.is_significant(alpha))
            .max_by(|a, b| a.conversion_rate().total_cmp(&b.conversion_rate()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn variant(name: &str, pct: f64) -> Variant {
        Variant {
            id: None,
            name: name.into(),
            traffic_percentage: pct,
            is_control: false,
            variant_data: None,
        }
    }

    #[test]
    fn split_tolerance_boundaries() {
        assert!(validate_split(&[0.5, 0.5]).is_empty());
        assert!(validate_split(&[0.5, 0.49]).is_empty(), "0.99 is within tolerance");
        assert!(validate_split(&[0.5, 0.51]).is_empty(), "1.01 is within tolerance");
        assert!(validate_split(&[0.5, 0.48]).contains("traffic_split"), "0.98 is rejected");
    }

    #[test]
    fn three_way_thirty_percent_fails_even_split_passes() {
        assert!(validate_split(&[0.3, 0.3, 0.3]).contains("traffic_split"));
        assert!(validate_split(&[0.333, 0.333, 0.334]).is_empty());
        assert_eq!(distribute_evenly(3), vec![0.333, 0.333, 0.334]);
        assert!(validate_split(&distribute_evenly(7)).is_empty());
    }

    #[test]
    fn variant_count_and_positive_shares() {
        assert!(validate_split(&[1.0]).contains("variants"));
        assert!(validate_split(&[0.1; 11]).contains("variants"));
        let errors = validate_split(&[1.0, 0.0]);
        assert!(errors.contains("variants[1].traffic_percentage"));
    }

    #[test]
    fn variant_data_must_match_test_type() {
        let mut a = variant("A", 0.5);
        a.variant_data = Some(VariantData::Audience {
            segment: "returning".into(),
        });
        let mut b = variant("B", 0.5);
        b.variant_data = Some(VariantData::Timing {
            post_time: "25:00".into(),
            weekday: None,
        });
        let errors = AbTestDefinition::validate_variants(TestType::Timing, &[a, b]);
        assert!(errors.contains("variants[0].variant_data"));
        assert!(errors.contains("variants[1].variant_data.post_time"));
    }

    #[test]
    fn significance_uses_precomputed_p_value() {
        let r = VariantResult {
            variant_id: "v1".into(),
            impressions: 200,
            conversions: 10,
            p_value: Some(0.03),
            confidence: Some(0.97),
        };
        assert!(r.is_significant(0.05));
        assert!(!r.is_significant(0.01));
        assert!((r.conversion_rate() - 0.05).abs() < 1e-12);
    }

    #[test]
    fn deserializes_with_defaults() {
        let t: AbTestDefinition = serde_json::from_value(serde_json::json!({
            "name": "Caption length",
            "hypothesis": "Short captions convert better",
            "test_type": "content",
            "variants": [
                {"name": "Short", "traffic_percentage": 0.5, "variant_data": {"type": "content", "caption": "Hi"}},
                {"name": "Long", "traffic_percentage": 0.5}
            ]
        }))
        .unwrap();
        assert_eq!(t.status, AbTestStatus::Draft);
        assert_eq!(t.traffic_allocation, 1.0);
        assert!(t.validate().is_empty());
    }
}
