use crate::cmd::Ctx;
use crate::output::print_json;
use anyhow::Context;
use cadence_core::config::{config_path, Config, WarnLevel};
use clap::Subcommand;

#[derive(Subcommand)]
pub enum ConfigSubcommand {
    /// Print the effective configuration
    Show,
    /// Check the configuration for common mistakes
    Validate,
    /// Write the effective configuration to the project config file
    Init,
}

pub fn run(ctx: &Ctx, subcmd: ConfigSubcommand) -> anyhow::Result<()> {
    match subcmd {
        ConfigSubcommand::Show => show(ctx),
        ConfigSubcommand::Validate => validate(ctx),
        ConfigSubcommand::Init => init(ctx),
    }
}

fn show(ctx: &Ctx) -> anyhow::Result<()> {
    let config = ctx.config()?;
    if ctx.json {
        return print_json(&config);
    }
    println!("API:      {} (timeout {}s)", config.api.base_url, config.api.timeout_seconds);
    println!("Tenant:   {}", config.tenant.as_deref().unwrap_or("-"));
    println!(
        "Polling:  task queue {}s, event feed {}s, analytics {}s",
        config.polling.task_queue().as_secs(),
        config.polling.event_feed().as_secs(),
        config.polling.analytics().as_secs()
    );
    Ok(())
}

fn validate(ctx: &Ctx) -> anyhow::Result<()> {
    let config = ctx.config()?;
    let warnings = config.validate();
    if ctx.json {
        print_json(&warnings)?;
    } else if warnings.is_empty() {
        println!("Config OK");
    } else {
        for w in &warnings {
            let tag = match w.level {
                WarnLevel::Warning => "warning",
                WarnLevel::Error => "error",
            };
            println!("{tag}: {}", w.message);
        }
    }
    if warnings.iter().any(|w| w.level == WarnLevel::Error) {
        anyhow::bail!("config has errors");
    }
    Ok(())
}

fn init(ctx: &Ctx) -> anyhow::Result<()> {
    let config: Config = ctx.config()?;
    config.save(&ctx.root).context("failed to write config")?;
    let path = config_path(&ctx.root);
    if ctx.json {
        print_json(&serde_json::json!({ "path": path }))?;
    } else {
        println!("Wrote {}", path.display());
    }
    Ok(())
}
