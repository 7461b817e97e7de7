use crate::cmd::Ctx;
use crate::output::{print_json, print_table};
use anyhow::Context;
use cadence_core::privacy::{PrivacyJob, PrivacyRequest, RetentionPolicy};
use cadence_core::types::PrivacyJobKind;
use clap::Subcommand;

#[derive(Subcommand)]
pub enum PrivacySubcommand {
    /// Show the retention policy, or change it
    Retention {
        /// New retention period in days (1-3650)
        #[arg(long = "set", value_name = "DAYS")]
        set: Option<u32>,
        /// Delete data automatically once it expires
        #[arg(long, action = clap::ArgAction::Set)]
        auto_delete: Option<bool>,
    },
    /// Export everything stored about a data subject
    Export { subject: String },
    /// Delete everything stored about a data subject
    Delete {
        subject: String,
        /// Required: confirms the deletion
        #[arg(long)]
        yes: bool,
    },
    /// List privacy jobs
    Jobs,
}

pub fn run(ctx: &Ctx, subcmd: PrivacySubcommand) -> anyhow::Result<()> {
    match subcmd {
        PrivacySubcommand::Retention { set, auto_delete } => retention(ctx, set, auto_delete),
        PrivacySubcommand::Export { subject } => start(ctx, PrivacyJobKind::Export, subject, false),
        PrivacySubcommand::Delete { subject, yes } => {
            start(ctx, PrivacyJobKind::Delete, subject, yes)
        }
        PrivacySubcommand::Jobs => jobs(ctx),
    }
}

fn retention(ctx: &Ctx, set: Option<u32>, auto_delete: Option<bool>) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let policy = ctx
        .block_on(async move {
            let current = client.retention().await?;
            if set.is_none() && auto_delete.is_none() {
                return Ok(current);
            }
            let next = RetentionPolicy {
                retention_days: set.unwrap_or(current.retention_days),
                auto_delete: auto_delete.unwrap_or(current.auto_delete),
            };
            next.validate().into_result()?;
            let saved = client.set_retention(&next).await?;
            Ok::<_, cadence_client::ClientError>(saved)
        })?
        .context("failed to update retention policy")?;

    if ctx.json {
        return print_json(&policy);
    }
    let auto = if policy.auto_delete { ", deleted automatically" } else { "" };
    println!("Data is kept for {} days{auto}", policy.retention_days);
    Ok(())
}

fn start(ctx: &Ctx, kind: PrivacyJobKind, subject: String, confirm: bool) -> anyhow::Result<()> {
    let request = PrivacyRequest { subject, confirm };
    if let Err(e) = request.validate(kind).into_result() {
        if kind == PrivacyJobKind::Delete && !confirm {
            anyhow::bail!("refusing to delete without --yes");
        }
        return Err(e.into());
    }
    let client = ctx.client()?;
    let job = ctx
        .block_on(async move {
            match kind {
                PrivacyJobKind::Export => client.request_export(&request).await,
                PrivacyJobKind::Delete => client.request_delete(&request).await,
            }
        })?
        .with_context(|| format!("failed to start {kind} job"))?;

    if ctx.json {
        return print_json(&job);
    }
    println!("{} job [{}] is {}", kind, job.id, job.status);
    if let Some(url) = &job.download_url {
        println!("Download: {url}");
    }
    Ok(())
}

fn jobs(ctx: &Ctx) -> anyhow::Result<()> {
    let client = ctx.client()?;
    let jobs: Vec<PrivacyJob> = ctx
        .block_on(async move { client.privacy_jobs().await })?
        .context("failed to load privacy jobs")?;

    if ctx.json {
        return print_json(&jobs);
    }
    if jobs.is_empty() {
        println!("No privacy jobs.");
        return Ok(());
    }
    let rows = jobs
        .iter()
        .map(|j| {
            vec![
                j.id.clone(),
                j.kind.to_string(),
                j.subject.clone(),
                j.status.to_string(),
                j.created_at.format("%Y-%m-%d %H:%M").to_string(),
            ]
        })
        .collect();
    print_table(&["ID", "KIND", "SUBJECT", "STATUS", "CREATED"], rows);
    Ok(())
}
