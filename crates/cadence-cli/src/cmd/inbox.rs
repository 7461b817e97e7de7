use crate::cmd::Ctx;
use crate::output::{print_json, print_table, truncate};
use anyhow::Context;
use cadence_client::{EventBus, InboxPanel};
use cadence_core::inbox::{sort_threads, unread_total};
use cadence_core::types::MessageDirection;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum InboxSubcommand {
    /// List conversations, most recent first
    Threads,
    /// Show the messages of a conversation
    Show { thread: String },
    /// Reply to a conversation
    Reply {
        thread: String,
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// Ask for an AI-drafted reply
    Draft {
        thread: String,
        /// e.g. friendly, formal
        #[arg(long)]
        tone: Option<String>,
    },
}

pub fn run(ctx: &Ctx, subcmd: InboxSubcommand) -> anyhow::Result<()> {
    match subcmd {
        InboxSubcommand::Threads => threads(ctx),
        InboxSubcommand::Show { thread } => show(ctx, &thread),
        InboxSubcommand::Reply { thread, text } => reply(ctx, &thread, &text.join(" ")),
        InboxSubcommand::Draft { thread, tone } => draft(ctx, &thread, tone),
    }
}

fn threads(ctx: &Ctx) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let mut threads = ctx
        .block_on(async move { client.threads().await })?
        .context("failed to load conversations")?;
    sort_threads(&mut threads);

    if ctx.json {
        return print_json(&threads);
    }
    if threads.is_empty() {
        println!("Inbox is empty.");
        return Ok(());
    }
    let rows = threads
        .iter()
        .map(|t| {
            vec![
                t.id.clone(),
                t.platform.clone(),
                t.participant.clone(),
                t.unread_count.to_string(),
                truncate(&t.last_message, 40),
                t.last_message_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "PLATFORM", "FROM", "UNREAD", "LAST MESSAGE", "AT"], rows);
    println!();
    println!("{} unread", unread_total(&threads));
    Ok(())
}

fn show(ctx: &Ctx, thread: &str) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let messages = ctx
        .block_on(async move { client.messages(thread).await })?
        .with_context(|| format!("failed to load conversation '{thread}'"))?;

    if ctx.json {
        return print_json(&messages);
    }
    for m in &messages {
        let arrow = match m.direction {
            MessageDirection::Inbound => "<",
            MessageDirection::Outbound => ">",
        };
        println!(
            "{} {arrow} {}: {}",
            m.sent_at.format("%m-%d %H:%M"),
            m.author,
            m.body
        );
    }
    Ok(())
}

fn reply(ctx: &Ctx, thread: &str, text: &str) -> anyhow::Result<()> {
    let mut panel = InboxPanel::new(ctx.client()?, EventBus::default());
    let message = ctx
        .block_on(async {
            panel.open(thread).await;
            panel.reply(text).await
        })?
        .with_context(|| format!("failed to reply to '{thread}'"))?;

    if ctx.json {
        print_json(&message)?;
    } else {
        println!("Sent [{}] to {thread}", message.id);
    }
    Ok(())
}

fn draft(ctx: &Ctx, thread: &str, tone: Option<String>) -> anyhow::Result<()> {
    let mut panel = InboxPanel::new(ctx.client()?, EventBus::default());
    let body = ctx
        .block_on(async {
            panel.open(thread).await;
            panel.request_draft(tone).await
        })?
        .with_context(|| format!("failed to draft a reply for '{thread}'"))?;

    if ctx.json {
        print_json(&serde_json::json!({ "thread_id": thread, "body": body }))?;
    } else {
        println!("{body}");
    }
    Ok(())
}
