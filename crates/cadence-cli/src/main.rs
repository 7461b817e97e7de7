mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    abtest::AbTestSubcommand, ai::AiSubcommand, config::ConfigSubcommand,
    inbox::InboxSubcommand, integration::IntegrationSubcommand, privacy::PrivacySubcommand,
    rule::RuleSubcommand, template::TemplateSubcommand, workflow::WorkflowSubcommand, Ctx,
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "cadence",
    about = "Automation rules, workflows and A/B tests for social publishing",
    version,
    propagate_version = true
)]
struct Cli {
    /// Project root (default: auto-detect from .cadence/ or .git/)
    #[arg(long, global = true, env = "CADENCE_ROOT")]
    root: Option<PathBuf>,

    /// Backend API base URL, overriding the config file
    #[arg(long, global = true, env = "CADENCE_API_URL")]
    api_url: Option<String>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Automation rules and their runs
    Rule {
        #[command(subcommand)]
        subcommand: RuleSubcommand,
    },

    /// Multi-step workflows
    Workflow {
        #[command(subcommand)]
        subcommand: WorkflowSubcommand,
    },

    /// A/B tests
    #[command(name = "abtest")]
    AbTest {
        #[command(subcommand)]
        subcommand: AbTestSubcommand,
    },

    /// Unified social inbox
    Inbox {
        #[command(subcommand)]
        subcommand: InboxSubcommand,
    },

    /// AI usage and budget
    Ai {
        #[command(subcommand)]
        subcommand: AiSubcommand,
    },

    /// Data retention, export and deletion
    Privacy {
        #[command(subcommand)]
        subcommand: PrivacySubcommand,
    },

    /// Content templates
    Template {
        #[command(subcommand)]
        subcommand: TemplateSubcommand,
    },

    /// Connected social accounts
    Integration {
        #[command(subcommand)]
        subcommand: IntegrationSubcommand,
    },

    /// Inspect and validate the configuration
    Config {
        #[command(subcommand)]
        subcommand: ConfigSubcommand,
    },

    /// Run the in-memory mock backend
    Serve {
        #[arg(long, default_value = "7070")]
        port: u16,

        /// Start with demo rules, workflows, tests and conversations
        #[arg(long)]
        seed: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = match &cli.command {
        Commands::Serve { .. } => tracing::Level::INFO,
        _ => tracing::Level::WARN,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let ctx = Ctx {
        root: root::resolve_root(cli.root.as_deref()),
        api_url: cli.api_url,
        json: cli.json,
    };

    let result = match cli.command {
        Commands::Rule { subcommand } => cmd::rule::run(&ctx, subcommand),
        Commands::Workflow { subcommand } => cmd::workflow::run(&ctx, subcommand),
        Commands::AbTest { subcommand } => cmd::abtest::run(&ctx, subcommand),
        Commands::Inbox { subcommand } => cmd::inbox::run(&ctx, subcommand),
        Commands::Ai { subcommand } => cmd::ai::run(&ctx, subcommand),
        Commands::Privacy { subcommand } => cmd::privacy::run(&ctx, subcommand),
        Commands::Template { subcommand } => cmd::template::run(&ctx, subcommand),
        Commands::Integration { subcommand } => cmd::integration::run(&ctx, subcommand),
        Commands::Config { subcommand } => cmd::config::run(&ctx, subcommand),
        Commands::Serve { port, seed } => cmd::serve::run(&ctx, port, seed),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
