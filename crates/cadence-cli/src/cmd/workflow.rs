use crate::cmd::{control, Ctx};
use crate::output::{on_off, print_json, print_table, report_validation, truncate};
use anyhow::Context;
use cadence_client::{ControlPanel, EventBus};
use cadence_core::dashboard::Filter;
use cadence_core::io::read_definition;
use cadence_core::types::ControlCommand;
use cadence_core::workflow::WorkflowDefinition;
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand)]
pub enum WorkflowSubcommand {
    /// Check a workflow file and print its step order
    Validate { file: PathBuf },
    /// List workflows
    List {
        #[arg(long)]
        search: Option<String>,
        /// draft | active | paused | archived
        #[arg(long)]
        status: Option<String>,
    },
    /// Create a workflow from a YAML or JSON file
    Create { file: PathBuf },
    /// Flip a workflow's enabled flag
    Toggle { id: String },
    /// Activate a draft or paused workflow
    Start { id: String },
    /// Pause an active workflow
    Stop { id: String },
    /// Delete a workflow
    Delete { id: String },
}

pub fn run(ctx: &Ctx, subcmd: WorkflowSubcommand) -> anyhow::Result<()> {
    match subcmd {
        WorkflowSubcommand::Validate { file } => validate(&file, ctx.json),
        WorkflowSubcommand::List { search, status } => list(
            ctx,
            &Filter {
                search,
                status,
                ..Filter::default()
            },
        ),
        WorkflowSubcommand::Create { file } => create(ctx, &file),
        WorkflowSubcommand::Toggle { id } => {
            control::<WorkflowDefinition>(ctx, &id, ControlCommand::Toggle)
        }
        WorkflowSubcommand::Start { id } => {
            control::<WorkflowDefinition>(ctx, &id, ControlCommand::Start)
        }
        WorkflowSubcommand::Stop { id } => {
            control::<WorkflowDefinition>(ctx, &id, ControlCommand::Stop)
        }
        WorkflowSubcommand::Delete { id } => {
            control::<WorkflowDefinition>(ctx, &id, ControlCommand::Delete)
        }
    }
}

fn load(file: &Path) -> anyhow::Result<WorkflowDefinition> {
    read_definition(file)
        .with_context(|| format!("failed to read workflow from {}", file.display()))
}

fn validate(file: &Path, json: bool) -> anyhow::Result<()> {
    let workflow = load(file)?;
    report_validation(
        &format!("workflow '{}'", workflow.name),
        &workflow.validate(),
        json,
    )?;
    if json {
        return Ok(());
    }
    let graph = workflow.graph()?;
    let order = graph.topological_order()?;
    println!("Step order:");
    for (i, id) in order.iter().enumerate() {
        let step = graph.step(*id);
        println!(
            "  {}. [{}] {} ({})",
            i + 1,
            step.position,
            step.name,
            step.step_type()
        );
    }
    Ok(())
}

fn list(ctx: &Ctx, filter: &Filter) -> anyhow::Result<()> {
    let panel: ControlPanel<WorkflowDefinition> =
        ControlPanel::new(ctx.client()?, EventBus::default());
    let workflows = ctx
        .block_on(async {
            panel.refresh().await?;
            Ok::<_, cadence_client::ClientError>(panel.filtered(filter).await)
        })?
        .context("failed to list workflows")?;

    if ctx.json {
        return print_json(&workflows);
    }
    if workflows.is_empty() {
        println!("No workflows.");
        return Ok(());
    }
    let rows = workflows
        .iter()
        .map(|w| {
            vec![
                w.id_or_empty().to_string(),
                truncate(&w.name, 32),
                w.trigger_type.to_string(),
                w.status.to_string(),
                on_off(w.enabled),
                w.steps.len().to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "TRIGGER", "STATUS", "ENABLED", "STEPS"], rows);
    Ok(())
}

fn create(ctx: &Ctx, file: &Path) -> anyhow::Result<()> {
    let workflow = load(file)?;
    let errors = workflow.validate();
    if !errors.is_empty() {
        return report_validation(&format!("workflow '{}'", workflow.name), &errors, ctx.json);
    }
    let client = ctx.client()?;
    let created = ctx
        .block_on(async move { client.create_workflow(&workflow).await })?
        .context("failed to create workflow")?;

    if ctx.json {
        print_json(&created)?;
    } else {
        println!(
            "Created workflow [{}]: {} ({} steps, {})",
            created.id_or_empty(),
            created.name,
            created.steps.len(),
            created.status
        );
    }
    Ok(())
}
