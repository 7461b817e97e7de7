use crate::cmd::Ctx;
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use cadence_core::template::{parse_vars, Template};
use cadence_core::CadenceError;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum TemplateSubcommand {
    /// List content templates
    List,
    /// Render a template with `{{variable}}` substitutions
    Render {
        id: String,
        /// Variable as key=value; repeatable
        #[arg(long = "var", value_name = "KEY=VALUE")]
        vars: Vec<String>,
    },
}

pub fn run(ctx: &Ctx, subcmd: TemplateSubcommand) -> anyhow::Result<()> {
    match subcmd {
        TemplateSubcommand::List => list(ctx),
        TemplateSubcommand::Render { id, vars } => render(ctx, &id, &vars),
    }
}

fn fetch(ctx: &Ctx) -> anyhow::Result<Vec<Template>> {
    let client = ctx.client()?;
    ctx.block_on(async move { client.list_templates().await })?
        .context("failed to load templates")
}

fn list(ctx: &Ctx) -> anyhow::Result<()> {
    let templates = fetch(ctx)?;
    if ctx.json {
        return print_json(&templates);
    }
    if templates.is_empty() {
        println!("No templates.");
        return Ok(());
    }
    let rows = templates
        .iter()
        .map(|t| {
            vec![
                t.id.clone().unwrap_or_default(),
                t.name.clone(),
                t.platform.clone().unwrap_or_else(|| "-".to_string()),
                t.placeholders().join(", "),
                truncate(&t.body, 40),
            ]
        })
        .collect();
    print_table(&["ID", "NAME", "PLATFORM", "VARIABLES", "BODY"], rows);
    Ok(())
}

fn render(ctx: &Ctx, id: &str, vars: &[String]) -> anyhow::Result<()> {
    let vars = parse_vars(vars.iter().map(String::as_str))?;
    let template = fetch(ctx)?
        .into_iter()
        .find(|t| t.id.as_deref() == Some(id))
        .ok_or_else(|| CadenceError::TemplateNotFound(id.to_string()))?;
    let text = template.render(&vars)?;

    if ctx.json {
        print_json(&serde_json::json!({ "id": id, "text": text }))?;
    } else {
        println!("{text}");
    }
    Ok(())
}
