use crate::cmd::{control, Ctx};
use crate::output::{print_json, print_table, report_validation, truncate};
use anyhow::Context;
use cadence_client::{ControlPanel, EventBus};
use cadence_core::abtest::AbTestDefinition;
use cadence_core::builder::AbTestForm;
use cadence_core::dashboard::Filter;
use cadence_core::io::read_definition;
use cadence_core::types::{ControlCommand, TestType};
use clap::Subcommand;
use std::path::{Path, PathBuf};

/// Significance level used when naming a leading variant.
const ALPHA: f64 = 0.05;

#[derive(Subcommand)]
pub enum AbTestSubcommand {
    /// Check an A/B test file without contacting the backend
    Validate { file: PathBuf },
    /// List A/B tests
    List {
        #[arg(long)]
        search: Option<String>,
        /// draft | running | paused | completed
        #[arg(long)]
        status: Option<String>,
        #[arg(long = "type")]
        test_type: Option<TestType>,
    },
    /// Create an A/B test from a YAML or JSON file
    Create { file: PathBuf },
    /// Show a test's variants and reported results
    Show { id: String },
    /// Start a draft or paused test
    Start { id: String },
    /// Complete a running test
    Stop { id: String },
    /// Delete a test
    Delete { id: String },
    /// Print an even traffic split for `n` variants
    Split { n: usize },
}

pub fn run(ctx: &Ctx, subcmd: AbTestSubcommand) -> anyhow::Result<()> {
    match subcmd {
        AbTestSubcommand::Validate { file } => validate(&file, ctx.json),
        AbTestSubcommand::List {
            search,
            status,
            test_type,
        } => list(
            ctx,
            &Filter {
                search,
                status,
                kind: test_type.map(|t| t.to_string()),
                trigger: None,
            },
        ),
        AbTestSubcommand::Create { file } => create(ctx, &file),
        AbTestSubcommand::Show { id } => show(ctx, &id),
        AbTestSubcommand::Start { id } => {
            control::<AbTestDefinition>(ctx, &id, ControlCommand::Start)
        }
        AbTestSubcommand::Stop { id } => control::<AbTestDefinition>(ctx, &id, ControlCommand::Stop),
        AbTestSubcommand::Delete { id } => {
            control::<AbTestDefinition>(ctx, &id, ControlCommand::Delete)
        }
        AbTestSubcommand::Split { n } => split(n, ctx.json),
    }
}

fn load(file: &Path) -> anyhow::Result<AbTestDefinition> {
    read_definition(file).with_context(|| format!("failed to read A/B test from {}", file.display()))
}

fn validate(file: &Path, json: bool) -> anyhow::Result<()> {
    let test = load(file)?;
    report_validation(&format!("A/B test '{}'", test.name), &test.validate(), json)
}

fn fetch_all(ctx: &Ctx, filter: &Filter) -> anyhow::Result<Vec<AbTestDefinition>> {
    let panel: ControlPanel<AbTestDefinition> =
        ControlPanel::new(ctx.client()?, EventBus::default());
    ctx.block_on(async {
        panel.refresh().await?;
        Ok::<_, cadence_client::ClientError>(panel.filtered(filter).await)
    })?
    .context("failed to list A/B tests")
}

fn list(ctx: &Ctx, filter: &Filter) -> anyhow::Result<()> {
    let tests = fetch_all(ctx, filter)?;
    if ctx.json {
        return print_json(&tests);
    }
    if tests.is_empty() {
        println!("No A/B tests.");
        return Ok(());
    }
    let rows = tests
        .iter()
        .map(|t| {
            vec![
                t.id_or_empty().to_string(),
                truncate(&t.name, 32),
                t.test_type.to_string(),
                t.status.to_string(),
                t.variants.len().to_string(),
                format!("{:.0}%", t.traffic_allocation * 100.0),
            ]
        })
        .collect();
    print_table(
        &["ID", "NAME", "TYPE", "STATUS", "VARIANTS", "ALLOCATION"],
        rows,
    );
    Ok(())
}

fn show(ctx: &Ctx, id: &str) -> anyhow::Result<()> {
    let test = fetch_all(ctx, &Filter::default())?
        .into_iter()
        .find(|t| t.id_or_empty() == id)
        .with_context(|| format!("A/B test '{id}' not found"))?;

    if ctx.json {
        return print_json(&test);
    }
    println!("{} ({}, {})", test.name, test.test_type, test.status);
    println!("Hypothesis: {}", test.hypothesis);
    println!();
    let rows = test
        .variants
        .iter()
        .map(|v| {
            let result = v
                .id
                .as_deref()
                .and_then(|vid| test.results.iter().find(|r| r.variant_id == vid));
            vec![
                v.name.clone(),
                if v.is_control { "yes" } else { "" }.to_string(),
                format!("{:.1}%", v.traffic_percentage * 100.0),
                result.map_or("-".into(), |r| r.impressions.to_string()),
                result.map_or("-".into(), |r| format!("{:.2}%", r.conversion_rate() * 100.0)),
                result
                    .and_then(|r| r.p_value)
                    .map_or("-".into(), |p| format!("{p:.3}")),
            ]
        })
        .collect();
    print_table(
        &["VARIANT", "CONTROL", "TRAFFIC", "IMPRESSIONS", "CONVERSION", "P-VALUE"],
        rows,
    );
    if let Some(leader) = test.leader(ALPHA) {
        let name = test
            .variants
            .iter()
            .find(|v| v.id.as_deref() == Some(leader.variant_id.as_str()))
            .map_or(leader.variant_id.as_str(), |v| v.name.as_str());
        println!();
        println!("Leading variant: {name}");
    }
    Ok(())
}

fn create(ctx: &Ctx, file: &Path) -> anyhow::Result<()> {
    let test = load(file)?;
    let errors = test.validate();
    if !errors.is_empty() {
        return report_validation(&format!("A/B test '{}'", test.name), &errors, ctx.json);
    }
    let client = ctx.client()?;
    let created = ctx
        .block_on(async move { client.create_ab_test(&test).await })?
        .context("failed to create A/B test")?;

    if ctx.json {
        print_json(&created)?;
    } else {
        println!("Created A/B test [{}]: {}", created.id_or_empty(), created.name);
    }
    Ok(())
}

fn split(n: usize, json: bool) -> anyhow::Result<()> {
    let mut form = AbTestForm::default();
    for i in 0..n {
        let name = if i == 0 {
            "Control".to_string()
        } else {
            format!("Variant {}", (b'A' + (i as u8 % 26)) as char)
        };
        form.add_variant(name);
    }
    form.split_evenly();
    let shares: Vec<f64> = form.variants.iter().map(|v| v.traffic_percentage).collect();
    let errors = cadence_core::abtest::validate_split(&shares);
    if !errors.is_empty() {
        return report_validation(&format!("a {n}-way split"), &errors, json);
    }

    if json {
        return print_json(&form.variants);
    }
    let rows = form
        .variants
        .iter()
        .map(|v| vec![v.name.clone(), format!("{:.3}", v.traffic_percentage)])
        .collect();
    print_table(&["VARIANT", "SHARE"], rows);
    Ok(())
}
