use crate::types::Operator;
use crate::validation::ValidationErrors;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

// ---------------------------------------------------------------------------
// Condition tree
// ---------------------------------------------------------------------------

/// A single `{field, operator, value}` comparison against an event payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub field: String,
    pub operator: Operator,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
    #[serde(alias = "AND")]
    And,
    #[serde(alias = "OR")]
    Or,
}

impl Combinator {
    pub fn as_str(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// Predicate gating whether a rule's actions fire.
///
/// On the wire a group is `{"op": "and", "conditions": [...]}` and a leaf is
/// a bare comparison object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Condition {
    Group {
        op: Combinator,
        conditions: Vec<Condition>,
    },
    Leaf(Comparison),
}

impl Condition {
    pub fn leaf(field: impl Into<String>, operator: Operator, value: impl Into<Value>) -> Self {
        Condition::Leaf(Comparison {
            field: field.into(),
            operator,
            value: value.into(),
        })
    }

    pub fn all(conditions: Vec<Condition>) -> Self {
        Condition::Group {
            op: Combinator::And,
            conditions,
        }
    }

    pub fn any(conditions: Vec<Condition>) -> Self {
        Condition::Group {
            op: Combinator::Or,
            conditions,
        }
    }

    /// Evaluate against `payload`. Groups short-circuit left to right.
    pub fn evaluate(&self, payload: &Value) -> bool {
        match self {
            Condition::Leaf(c) => c.evaluate(payload),
            Condition::Group { op, conditions } => match op {
                Combinator::And => conditions.iter().all(|c| c.evaluate(payload)),
                Combinator::Or => conditions.iter().any(|c| c.evaluate(payload)),
            },
        }
    }

    /// Evaluate and record every leaf that was actually visited.
    pub fn explain(&self, payload: &Value) -> EvaluationReport {
        let mut leaves = Vec::new();
        let condition_met = self.explain_into(payload, &mut leaves);
        EvaluationReport {
            condition_met,
            leaves,
        }
    }

    fn explain_into(&self, payload: &Value, out: &mut Vec<LeafOutcome>) -> bool {
        match self {
            Condition::Leaf(c) => {
                let actual = resolve(payload, &c.field).cloned();
                let matched = c.evaluate(payload);
                out.push(LeafOutcome {
                    field: c.field.clone(),
                    operator: c.operator,
                    expected: c.value.clone(),
                    actual,
                    matched,
                });
                matched
            }
            Condition::Group { op, conditions } => {
                for child in conditions {
                    let r = child.explain_into(payload, out);
                    match (op, r) {
                        (Combinator::And, false) => return false,
                        (Combinator::Or, true) => return true,
                        _ => {}
                    }
                }
                matches!(op, Combinator::And)
            }
        }
    }

    /// Depth-first list of comparisons in the tree.
    pub fn comparisons(&self) -> Vec<&Comparison> {
        let mut out = Vec::new();
        self.collect_comparisons(&mut out);
        out
    }

    fn collect_comparisons<'a>(&'a self, out: &mut Vec<&'a Comparison>) {
        match self {
            Condition::Leaf(c) => out.push(c),
            Condition::Group { conditions, .. } => {
                for child in conditions {
                    child.collect_comparisons(out);
                }
            }
        }
    }

    /// Structural checks: non-empty groups, and non-blank field and value on
    /// every leaf. Keys are relative (`field`, `conditions[1].value`).
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        match self {
            Condition::Leaf(c) => {
                errors.require("field", &c.field, "Field is required");
                if is_blank(&c.value) {
                    errors.add("value", "Value is required");
                }
            }
            Condition::Group { conditions, .. } => {
                if conditions.is_empty() {
                    errors.add("conditions", "At least one condition is required");
                }
                for (i, child) in conditions.iter().enumerate() {
                    errors.merge_prefixed(&format!("conditions[{i}]"), child.validate());
                }
            }
        }
        errors
    }

    fn fmt_nested(&self, f: &mut fmt::Formatter<'_>, nested: bool) -> fmt::Result {
        match self {
            Condition::Leaf(c) => write!(f, "{c}"),
            Condition::Group { op, conditions } => {
                if nested {
                    f.write_str("(")?;
                }
                for (i, child) in conditions.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", op.as_str())?;
                    }
                    child.fmt_nested(f, true)?;
                }
                if nested {
                    f.write_str(")")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_nested(f, false)
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.operator, text(&self.value))
    }
}

// ---------------------------------------------------------------------------
// Leaf evaluation
// ---------------------------------------------------------------------------

impl Comparison {
    /// A field that is absent from the payload (or `null`) is `false` for
    /// every operator, negated ones included.
    pub fn evaluate(&self, payload: &Value) -> bool {
        let Some(actual) = resolve(payload, &self.field) else {
            return false;
        };
        let expected = &self.value;
        match self.operator {
            Operator::Eq => values_equal(actual, expected),
            Operator::Ne => !values_equal(actual, expected),
            Operator::Gt => compare(actual, expected) == Ordering::Greater,
            Operator::Gte => compare(actual, expected) != Ordering::Less,
            Operator::Lt => compare(actual, expected) == Ordering::Less,
            Operator::Lte => compare(actual, expected) != Ordering::Greater,
            Operator::In => list_items(expected).iter().any(|v| values_equal(actual, v)),
            Operator::NotIn => !list_items(expected).iter().any(|v| values_equal(actual, v)),
            Operator::Contains => contains(actual, expected),
            Operator::NotContains => !contains(actual, expected),
        }
    }
}

/// Look up `field` in `payload`. An exact key wins; otherwise dotted segments
/// descend into nested objects.
pub fn resolve<'a>(payload: &'a Value, field: &str) -> Option<&'a Value> {
    let found = match payload.get(field) {
        Some(v) => Some(v),
        None if field.contains('.') => field
            .split('.')
            .try_fold(payload, |cur, segment| cur.get(segment)),
        None => None,
    };
    found.filter(|v| !v.is_null())
}

fn as_number(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

fn text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn compare(actual: &Value, expected: &Value) -> Ordering {
    match (as_number(actual), as_number(expected)) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => text(actual).cmp(&text(expected)),
    }
}

fn values_equal(actual: &Value, expected: &Value) -> bool {
    compare(actual, expected) == Ordering::Equal
}

/// `in`/`not_in` operand: a JSON array, or a comma-delimited string.
fn list_items(expected: &Value) -> Vec<Value> {
    match expected {
        Value::Array(items) => items.clone(),
        Value::String(s) => s
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| Value::String(s.to_string()))
            .collect(),
        other => vec![other.clone()],
    }
}

fn contains(actual: &Value, expected: &Value) -> bool {
    match actual {
        Value::Array(items) => items.iter().any(|v| values_equal(v, expected)),
        other => text(other).contains(&text(expected)),
    }
}

fn is_blank(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

// ---------------------------------------------------------------------------
// EvaluationReport
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeafOutcome {
    pub field: String,
    pub operator: Operator,
    pub expected: Value,
    /// Value observed in the payload; `None` when the field was absent.
    pub actual: Option<Value>,
    pub matched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub condition_met: bool,
    pub leaves: Vec<LeafOutcome>,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lt_compares_numerically() {
        let c = Condition::leaf("engagement_rate", Operator::Lt, 0.02);
        assert!(c.evaluate(&json!({"engagement_rate": 0.01})));
        assert!(!c.evaluate(&json!({"engagement_rate": 0.05})));
    }

    #[test]
    fn numeric_strings_compare_as_numbers() {
        let c = Condition::leaf("likes", Operator::Gt, "9");
        assert!(c.evaluate(&json!({"likes": "10"})));
        assert!(c.evaluate(&json!({"likes": 10})));
    }

    #[test]
    fn non_numeric_values_compare_as_strings() {
        let c = Condition::leaf("platform", Operator::Eq, "instagram");
        assert!(c.evaluate(&json!({"platform": "instagram"})));
        assert!(!c.evaluate(&json!({"platform": "tiktok"})));
        let gt = Condition::leaf("platform", Operator::Gt, "facebook");
        assert!(gt.evaluate(&json!({"platform": "instagram"})));
    }

    #[test]
    fn booleans_compare_by_text() {
        let c = Condition::leaf("is_boosted", Operator::Eq, "true");
        assert!(c.evaluate(&json!({"is_boosted": true})));
    }

    #[test]
    fn missing_field_is_false_for_every_operator() {
        let payload = json!({"other": 1});
        for op in Operator::all() {
            let c = Condition::leaf("absent", *op, "x");
            assert!(!c.evaluate(&payload), "operator {op} should be false");
        }
    }

    #[test]
    fn null_field_counts_as_missing() {
        let c = Condition::leaf("campaign", Operator::Ne, "spring");
        assert!(!c.evaluate(&json!({"campaign": null})));
    }

    #[test]
    fn in_is_membership_of_delimited_list() {
        let c = Condition::leaf("platform", Operator::In, "instagram, tiktok,facebook");
        for p in ["instagram", "tiktok", "facebook"] {
            assert!(c.evaluate(&json!({ "platform": p })));
        }
        assert!(!c.evaluate(&json!({"platform": "linkedin"})));
        assert!(!c.evaluate(&json!({"platform": "insta"})));
    }

    #[test]
    fn in_accepts_json_arrays_and_numbers() {
        let c = Condition::leaf("weekday", Operator::In, json!([1, 3, 5]));
        assert!(c.evaluate(&json!({"weekday": 3})));
        assert!(c.evaluate(&json!({"weekday": "5"})));
        assert!(!c.evaluate(&json!({"weekday": 2})));
    }

    #[test]
    fn not_in_negates_membership() {
        let c = Condition::leaf("status", Operator::NotIn, "archived,deleted");
        assert!(c.evaluate(&json!({"status": "live"})));
        assert!(!c.evaluate(&json!({"status": "deleted"})));
    }

    #[test]
    fn contains_checks_substring_and_array_membership() {
        let c = Condition::leaf("caption", Operator::Contains, "sale");
        assert!(c.evaluate(&json!({"caption": "Summer sale today"})));
        let tags = Condition::leaf("hashtags", Operator::Contains, "promo");
        assert!(tags.evaluate(&json!({"hashtags": ["promo", "summer"]})));
        assert!(!tags.evaluate(&json!({"hashtags": ["promotion"]})));
        let not = Condition::leaf("caption", Operator::NotContains, "sale");
        assert!(not.evaluate(&json!({"caption": "New arrivals"})));
    }

    #[test]
    fn dotted_paths_descend_into_objects() {
        let c = Condition::leaf("metrics.engagement_rate", Operator::Gte, 0.1);
        assert!(c.evaluate(&json!({"metrics": {"engagement_rate": 0.1}})));
        let flat = json!({"metrics.engagement_rate": 0.2});
        assert!(c.evaluate(&flat));
    }

    #[test]
    fn groups_short_circuit() {
        let tree = Condition::any(vec![
            Condition::leaf("a", Operator::Eq, 1),
            Condition::leaf("b", Operator::Eq, 2),
        ]);
        let report = tree.explain(&json!({"a": 1, "b": 3}));
        assert!(report.condition_met);
        assert_eq!(report.leaves.len(), 1);

        let tree = Condition::all(vec![
            Condition::leaf("a", Operator::Eq, 1),
            Condition::leaf("b", Operator::Eq, 2),
        ]);
        let report = tree.explain(&json!({"a": 0, "b": 2}));
        assert!(!report.condition_met);
        assert_eq!(report.leaves.len(), 1);
        assert_eq!(report.leaves[0].actual, Some(json!(0)));
    }

    #[test]
    fn explain_agrees_with_evaluate() {
        let tree = Condition::all(vec![
            Condition::leaf("platform", Operator::In, "instagram,tiktok"),
            Condition::any(vec![
                Condition::leaf("reach", Operator::Lt, 100),
                Condition::leaf("engagement_rate", Operator::Lt, 0.02),
            ]),
        ]);
        for payload in [
            json!({"platform": "tiktok", "reach": 500, "engagement_rate": 0.01}),
            json!({"platform": "tiktok", "reach": 500, "engagement_rate": 0.05}),
            json!({"platform": "x", "reach": 5}),
        ] {
            assert_eq!(tree.explain(&payload).condition_met, tree.evaluate(&payload));
        }
    }

    #[test]
    fn wire_shapes_deserialize() {
        let leaf: Condition =
            serde_json::from_value(json!({"field": "engagement_rate", "operator": "lt", "value": 0.02}))
                .unwrap();
        assert!(matches!(leaf, Condition::Leaf(_)));

        let group: Condition = serde_json::from_value(json!({
            "op": "OR",
            "conditions": [
                {"field": "a", "operator": "eq", "value": "x"},
                {"op": "and", "conditions": [{"field": "b", "operator": "gt", "value": 1}]}
            ]
        }))
        .unwrap();
        assert_eq!(group.comparisons().len(), 2);
        assert_eq!(group.to_string(), "a eq x OR (b gt 1)");
    }

    #[test]
    fn validate_flags_blank_leaves_and_empty_groups() {
        let tree = Condition::all(vec![
            Condition::leaf("", Operator::Eq, "x"),
            Condition::leaf("b", Operator::Eq, ""),
            Condition::any(vec![]),
        ]);
        let errors = tree.validate();
        assert!(errors.contains("conditions[0].field"));
        assert!(errors.contains("conditions[1].value"));
        assert!(errors.contains("conditions[2].conditions"));
    }
}
