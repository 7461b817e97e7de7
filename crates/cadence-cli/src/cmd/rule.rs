use crate::cmd::Ctx;
use crate::output::{on_off, print_json, print_table, report_validation, truncate};
use anyhow::Context;
use cadence_client::{ControlPanel, EventBus, Poller, Scope};
use cadence_core::dashboard::{Filter, Listing};
use cadence_core::io::read_definition;
use cadence_core::rule::{summarize_runs, RuleDefinition, RuleRun, RuleTestRequest, RuleTestResult};
use cadence_core::types::{ControlCommand, RunStatus, Trigger};
use clap::Subcommand;
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum RuleSubcommand {
    /// Check a rule definition file without contacting the backend
    Validate { file: PathBuf },
    /// Evaluate a rule definition against a sample payload
    Test {
        file: PathBuf,
        /// Event payload as JSON
        #[arg(long, default_value = "{}")]
        payload: String,
        /// Evaluate on the backend instead of locally
        #[arg(long)]
        remote: bool,
    },
    /// List rules
    List {
        /// Case-insensitive match on name or description
        #[arg(long)]
        search: Option<String>,
        /// enabled | disabled
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        trigger: Option<Trigger>,
    },
    /// Create a rule from a YAML or JSON file
    Create { file: PathBuf },
    /// Enable or disable a rule
    Toggle {
        id: String,
        #[arg(long, action = clap::ArgAction::Set)]
        enabled: bool,
    },
    /// Delete a rule
    Delete { id: String },
    /// Show recent rule runs
    Runs {
        #[arg(long)]
        limit: Option<usize>,
        /// Keep polling and print runs as they appear or change
        #[arg(long)]
        watch: bool,
    },
    /// Retry a failed run
    Retry { run_id: String },
    /// Fire a trigger event at the mock backend
    Fire {
        trigger: Trigger,
        #[arg(long, default_value = "{}")]
        payload: String,
    },
}

pub fn run(ctx: &Ctx, subcmd: RuleSubcommand) -> anyhow::Result<()> {
    match subcmd {
        RuleSubcommand::Validate { file } => validate(&file, ctx.json),
        RuleSubcommand::Test {
            file,
            payload,
            remote,
        } => test(ctx, &file, &payload, remote),
        RuleSubcommand::List {
            search,
            status,
            trigger,
        } => list(
            ctx,
            &Filter {
                search,
                status,
                kind: None,
                trigger,
            },
        ),
        RuleSubcommand::Create { file } => create(ctx, &file),
        RuleSubcommand::Toggle { id, enabled } => toggle(ctx, &id, enabled),
        RuleSubcommand::Delete { id } => {
            super::control::<RuleDefinition>(ctx, &id, ControlCommand::Delete)
        }
        RuleSubcommand::Runs { limit, watch } => {
            if watch {
                watch_runs(ctx, limit)
            } else {
                runs(ctx, limit)
            }
        }
        RuleSubcommand::Retry { run_id } => retry(ctx, &run_id),
        RuleSubcommand::Fire { trigger, payload } => fire(ctx, trigger, &payload),
    }
}

fn load(file: &Path) -> anyhow::Result<RuleDefinition> {
    read_definition(file).with_context(|| format!("failed to read rule from {}", file.display()))
}

pub(crate) fn parse_payload(raw: &str) -> anyhow::Result<Value> {
    serde_json::from_str(raw).context("--payload is not valid JSON")
}

fn validate(file: &Path, json: bool) -> anyhow::Result<()> {
    let rule = load(file)?;
    report_validation(&format!("rule '{}'", rule.name), &rule.validate(), json)
}

fn test(ctx: &Ctx, file: &Path, payload: &str, remote: bool) -> anyhow::Result<()> {
    let rule = load(file)?;
    let payload = parse_payload(payload)?;
    let result = if remote {
        let client = ctx.client()?;
        let request = RuleTestRequest { rule, payload };
        ctx.block_on(async move { client.test_rule(&request).await })?
            .context("remote rule test failed")?
    } else {
        rule.test(&payload)
    };

    if ctx.json {
        return print_json(&result);
    }
    print_test_result(&result);
    Ok(())
}

fn print_test_result(result: &RuleTestResult) {
    let verdict = if result.condition_met { "met" } else { "not met" };
    println!("Condition {verdict}");
    for leaf in &result.report.leaves {
        let actual = leaf
            .actual
            .as_ref()
            .map(Value::to_string)
            .unwrap_or_else(|| "missing".to_string());
        let mark = if leaf.matched { "ok  " } else { "FAIL" };
        println!(
            "  {mark} {} {} {} (actual {actual})",
            leaf.field, leaf.operator, leaf.expected
        );
    }
    if result.actions.is_empty() {
        println!("No actions would run");
    } else {
        let names: Vec<&str> = result.actions.iter().map(|a| a.as_str()).collect();
        println!("Would run: {}", names.join(", "));
    }
}

fn list(ctx: &Ctx, filter: &Filter) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let panel: ControlPanel<RuleDefinition> = ControlPanel::new(client, EventBus::default());
    let rules = ctx.block_on(async {
        panel.refresh().await?;
        Ok::<_, cadence_client::ClientError>(panel.filtered(filter).await)
    })?
    .context("failed to list rules")?;

    if ctx.json {
        return print_json(&rules);
    }
    if rules.is_empty() {
        println!("No rules.");
        return Ok(());
    }
    let rows = rules
        .iter()
        .map(|r| {
            vec![
                r.id_or_empty().to_string(),
                truncate(&r.name, 32),
                r.trigger.to_string(),
                on_off(r.enabled),
                truncate(&r.condition.to_string(), 48),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "TRIGGER", "ENABLED", "CONDITION"], rows);
    Ok(())
}

fn create(ctx: &Ctx, file: &Path) -> anyhow::Result<()> {
    let rule = load(file)?;
    let errors = rule.validate();
    if !errors.is_empty() {
        return report_validation(&format!("rule '{}'", rule.name), &errors, ctx.json);
    }
    let client = ctx.client()?;
    let created = ctx
        .block_on(async move { client.create_rule(&rule).await })?
        .context("failed to create rule")?;

    if ctx.json {
        print_json(&created)?;
    } else {
        println!("Created rule [{}]: {}", created.id_or_empty(), created.name);
    }
    Ok(())
}

fn toggle(ctx: &Ctx, id: &str, enabled: bool) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let panel: ControlPanel<RuleDefinition> = ControlPanel::new(client, EventBus::default());
    let rule = ctx
        .block_on(async {
            panel.refresh().await?;
            let current = panel.items().await.into_iter().find(|r| r.id_or_empty() == id);
            if current.as_ref().is_some_and(|r| r.enabled != enabled) {
                panel.run(id, ControlCommand::Toggle).await?;
            }
            Ok::<_, cadence_client::ClientError>(
                panel.items().await.into_iter().find(|r| r.id_or_empty() == id),
            )
        })?
        .with_context(|| format!("failed to toggle rule '{id}'"))?
        .with_context(|| format!("rule '{id}' not found"))?;

    if ctx.json {
        print_json(&rule)?;
    } else {
        println!("Rule [{id}] is {}", rule.status());
    }
    Ok(())
}

fn run_row(run: &RuleRun) -> Vec<String> {
    vec![
        run.id.clone(),
        run.rule_id.clone(),
        run.status.to_string(),
        run.started_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        run.duration_ms()
            .map(|ms| format!("{ms}ms"))
            .unwrap_or_else(|| "-".to_string()),
    ]
}

fn runs(ctx: &Ctx, limit: Option<usize>) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let runs = ctx
        .block_on(async move { client.recent_runs(limit).await })?
        .context("failed to load recent runs")?;

    if ctx.json {
        return print_json(&serde_json::json!({
            "runs": runs,
            "summary": summarize_runs(&runs),
        }));
    }
    if runs.is_empty() {
        println!("No runs yet.");
        return Ok(());
    }
    print_table(
        &["RUN", "RULE", "STATUS", "STARTED", "DURATION"],
        runs.iter().map(run_row).collect(),
    );
    let summary = summarize_runs(&runs);
    if let Some(rate) = summary.success_rate {
        println!();
        println!(
            "{} runs, {} failed, {:.0}% success",
            summary.total,
            summary.failed,
            rate * 100.0
        );
    }
    Ok(())
}

/// Poll recent runs on the configured event-feed interval until Ctrl-C,
/// printing each run the first time it appears and whenever its status
/// changes.
fn watch_runs(ctx: &Ctx, limit: Option<usize>) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let every = ctx.config()?.polling.event_feed();
    let json = ctx.json;

    ctx.block_on(async move {
        let scope = Scope::new();
        let poller = Poller::spawn("rule-runs", every, scope.handle(), move || {
            let client = client.clone();
            async move { client.recent_runs(limit).await }
        });
        let mut rx = poller.subscribe();
        let mut seen: HashMap<String, RunStatus> = HashMap::new();
        eprintln!("Watching rule runs every {}s (Ctrl-C to stop)", every.as_secs());

        loop {
            tokio::select! {
                changed = rx.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    let latest = rx.borrow_and_update().clone();
                    for run in latest.unwrap_or_default().iter().rev() {
                        if seen.insert(run.id.clone(), run.status) == Some(run.status) {
                            continue;
                        }
                        if json {
                            println!("{}", serde_json::to_string(run)?);
                        } else {
                            println!("{}", run_row(run).join("  "));
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => break,
            }
        }
        scope.cancel();
        tracing::debug!(
            fetches = poller.fetch_count(),
            failures = poller.failure_count(),
            "stopped watching runs"
        );
        Ok::<_, anyhow::Error>(())
    })?
}

fn retry(ctx: &Ctx, run_id: &str) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let run = ctx
        .block_on(async move { client.retry_run(run_id).await })?
        .with_context(|| format!("failed to retry run '{run_id}'"))?;

    if ctx.json {
        print_json(&run)?;
    } else {
        println!("Run [{}] requeued ({})", run.id, run.status);
    }
    Ok(())
}

fn fire(ctx: &Ctx, trigger: Trigger, payload: &str) -> anyhow::Result<()> {
    let payload = parse_payload(payload)?;
    let client = ctx.client()?;
    let runs = ctx
        .block_on(async move { client.fire_event(trigger, &payload).await })?
        .with_context(|| format!("failed to fire '{trigger}'"))?;

    if ctx.json {
        return print_json(&runs);
    }
    if runs.is_empty() {
        println!("No rule matched '{trigger}'");
    } else {
        print_table(
            &["RUN", "RULE", "STATUS", "STARTED", "DURATION"],
            runs.iter().map(run_row).collect(),
        );
    }
    Ok(())
}
