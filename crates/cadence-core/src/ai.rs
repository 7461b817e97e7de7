use crate::validation::ValidationErrors;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Token and spend counters reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiUsage {
    #[serde(default)]
    pub requests_today: u64,
    #[serde(default)]
    pub tokens_today: u64,
    #[serde(default)]
    pub tokens_month: u64,
    #[serde(default)]
    pub cost_today: f64,
    #[serde(default)]
    pub cost_month: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<DateTime<Utc>>,
}

impl AiUsage {
    pub fn reset_daily(&mut self, now: DateTime<Utc>) {
        self.requests_today = 0;
        self.tokens_today = 0;
        self.cost_today = 0.0;
        self.reset_at = Some(now);
    }

    pub fn record(&mut self, tokens: u64, cost: f64) {
        self.requests_today += 1;
        self.tokens_today += tokens;
        self.tokens_month += tokens;
        self.cost_today += cost;
        self.cost_month += cost;
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiBudget {
    /// Zero means no limit.
    #[serde(default)]
    pub daily_limit: f64,
    #[serde(default)]
    pub monthly_limit: f64,
    /// Fraction of a limit at which usage turns into a warning.
    #[serde(default = "default_alert_threshold")]
    pub alert_threshold: f64,
}

fn default_alert_threshold() -> f64 {
    0.8
}

impl Default for AiBudget {
    fn default() -> Self {
        Self {
            daily_limit: 0.0,
            monthly_limit: 0.0,
            alert_threshold: default_alert_threshold(),
        }
    }
}

impl AiBudget {
    pub fn validate(&self) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        if self.daily_limit < 0.0 {
            errors.add("daily_limit", "Daily limit cannot be negative");
        }
        if self.monthly_limit < 0.0 {
            errors.add("monthly_limit", "Monthly limit cannot be negative");
        }
        if self.daily_limit > 0.0 && self.monthly_limit > 0.0 && self.daily_limit > self.monthly_limit {
            errors.add("daily_limit", "Daily limit cannot exceed the monthly limit");
        }
        if !(self.alert_threshold > 0.0 && self.alert_threshold <= 1.0) {
            errors.add("alert_threshold", "Alert threshold must be in (0, 1]");
        }
        errors
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetState {
    Ok,
    Warning,
    Exceeded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetStatus {
    pub daily: BudgetState,
    pub monthly: BudgetState,
    pub daily_ratio: Option<f64>,
    pub monthly_ratio: Option<f64>,
}

impl BudgetStatus {
    pub fn worst(&self) -> BudgetState {
        self.daily.max(self.monthly)
    }
}

fn classify(spent: f64, limit: f64, threshold: f64) -> (BudgetState, Option<f64>) {
    if limit <= 0.0 {
        return (BudgetState::Ok, None);
    }
    let ratio = spent / limit;
    let state = if ratio >= 1.0 {
        BudgetState::Exceeded
    } else if ratio >= threshold {
        BudgetState::Warning
    } else {
        BudgetState::Ok
    };
    (state, Some(ratio))
}

pub fn budget_status(usage: &AiUsage, budget: &AiBudget) -> BudgetStatus {
    let (daily, daily_ratio) = classify(usage.cost_today, budget.daily_limit, budget.alert_threshold);
    let (monthly, monthly_ratio) =
        classify(usage.cost_month, budget.monthly_limit, budget.alert_threshold);
    BudgetStatus {
        daily,
        monthly,
        daily_ratio,
        monthly_ratio,
    }
}
