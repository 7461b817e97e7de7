use crate::cmd::Ctx;
use crate::output::{print_json, print_table};
use anyhow::Context;
use cadence_core::types::Provider;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum IntegrationSubcommand {
    /// Show every provider and whether it is connected
    List,
    /// Open the provider's OAuth page in the browser
    Connect {
        provider: Provider,
        /// Print the URL instead of opening it
        #[arg(long)]
        no_open: bool,
    },
}

pub fn run(ctx: &Ctx, subcmd: IntegrationSubcommand) -> anyhow::Result<()> {
    match subcmd {
        IntegrationSubcommand::List => list(ctx),
        IntegrationSubcommand::Connect { provider, no_open } => connect(ctx, provider, no_open),
    }
}

fn list(ctx: &Ctx) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let known = ctx
        .block_on(async move { client.list_integrations().await })?
        .context("failed to load integrations")?;
    let all = cadence_core::integration::merge_with_providers(&known);

    if ctx.json {
        return print_json(&all);
    }
    let rows = all
        .iter()
        .map(|i| {
            vec![
                i.provider.to_string(),
                if i.connected { "connected" } else { "-" }.to_string(),
                i.account_name.clone().unwrap_or_default(),
                i.connected_at
                    .map(|at| at.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
            ]
        })
        .collect();
    print_table(&["PROVIDER", "STATUS", "ACCOUNT", "SINCE"], rows);
    Ok(())
}

fn connect(ctx: &Ctx, provider: Provider, no_open: bool) -> anyhow::Result<()> {
    let url = ctx.client()?.authorize_url(provider);
    if ctx.json {
        return print_json(&serde_json::json!({ "provider": provider, "url": url }));
    }
    if no_open {
        println!("{url}");
        return Ok(());
    }
    println!("Opening {url}");
    if let Err(e) = open::that(&url) {
        tracing::warn!(error = %e, "could not open browser");
        println!("Open this URL to continue: {url}");
    }
    Ok(())
}
