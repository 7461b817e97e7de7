use crate::cmd::Ctx;
use crate::output::print_json;
use anyhow::Context;
use cadence_core::ai::{budget_status, AiBudget, BudgetState};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum AiSubcommand {
    /// Show today's and this month's AI usage against the budget
    Usage,
    /// Show the budget, or update it when any limit is given
    Budget {
        /// Daily spend limit; 0 means unlimited
        #[arg(long)]
        daily: Option<f64>,
        /// Monthly spend limit; 0 means unlimited
        #[arg(long)]
        monthly: Option<f64>,
        /// Fraction of a limit that triggers a warning
        #[arg(long)]
        alert_threshold: Option<f64>,
    },
    /// Reset today's counters
    ResetDaily,
}

pub fn run(ctx: &Ctx, subcmd: AiSubcommand) -> anyhow::Result<()> {
    match subcmd {
        AiSubcommand::Usage => usage(ctx),
        AiSubcommand::Budget {
            daily,
            monthly,
            alert_threshold,
        } => budget(ctx, daily, monthly, alert_threshold),
        AiSubcommand::ResetDaily => reset_daily(ctx),
    }
}

fn state_label(state: BudgetState) -> &'static str {
    match state {
        BudgetState::Ok => "ok",
        BudgetState::Warning => "WARNING",
        BudgetState::Exceeded => "EXCEEDED",
    }
}

fn limit_label(limit: f64) -> String {
    if limit > 0.0 {
        format!("${limit:.2}")
    } else {
        "unlimited".to_string()
    }
}

fn usage(ctx: &Ctx) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let (usage, budget) = ctx
        .block_on(async move {
            let usage = client.ai_usage().await?;
            let budget = client.ai_budget().await?;
            Ok::<_, cadence_client::ClientError>((usage, budget))
        })?
        .context("failed to load AI usage")?;
    let status = budget_status(&usage, &budget);

    if ctx.json {
        return print_json(&serde_json::json!({
            "usage": usage,
            "budget": budget,
            "status": status,
        }));
    }
    println!(
        "Today:      {} requests, {} tokens, ${:.2} of {} [{}]",
        usage.requests_today,
        usage.tokens_today,
        usage.cost_today,
        limit_label(budget.daily_limit),
        state_label(status.daily)
    );
    println!(
        "This month: {} tokens, ${:.2} of {} [{}]",
        usage.tokens_month,
        usage.cost_month,
        limit_label(budget.monthly_limit),
        state_label(status.monthly)
    );
    if let Some(at) = usage.reset_at {
        println!("Daily counters last reset {}", at.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}

fn budget(
    ctx: &Ctx,
    daily: Option<f64>,
    monthly: Option<f64>,
    alert_threshold: Option<f64>,
) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let updating = daily.is_some() || monthly.is_some() || alert_threshold.is_some();
    let budget = ctx
        .block_on(async move {
            let current = client.ai_budget().await?;
            if !updating {
                return Ok(current);
            }
            let next = AiBudget {
                daily_limit: daily.unwrap_or(current.daily_limit),
                monthly_limit: monthly.unwrap_or(current.monthly_limit),
                alert_threshold: alert_threshold.unwrap_or(current.alert_threshold),
            };
            next.validate().into_result()?;
            let saved = client.set_ai_budget(&next).await?;
            Ok::<_, cadence_client::ClientError>(saved)
        })?
        .context("failed to update AI budget")?;

    if ctx.json {
        return print_json(&budget);
    }
    println!("Daily limit:     {}", limit_label(budget.daily_limit));
    println!("Monthly limit:   {}", limit_label(budget.monthly_limit));
    println!("Alert threshold: {:.0}%", budget.alert_threshold * 100.0);
    Ok(())
}

fn reset_daily(ctx: &Ctx) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let usage = ctx
        .block_on(async move { client.reset_daily_usage().await })?
        .context("failed to reset daily usage")?;

    if ctx.json {
        print_json(&usage)?;
    } else {
        println!("Daily AI usage reset");
    }
    Ok(())
}
