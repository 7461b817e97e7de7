pub mod abtest;
pub mod ai;
pub mod config;
pub mod inbox;
pub mod integration;
pub mod privacy;
pub mod rule;
pub mod serve;
pub mod template;
pub mod workflow;

use crate::output::print_json;
use anyhow::Context as _;
use cadence_client::{ApiClient, ClientError, ControlPanel, EventBus, Remote};
use cadence_core::config::Config;
use cadence_core::dashboard::Listing;
use cadence_core::types::ControlCommand;
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;

/// Global flags shared by every subcommand.
pub struct Ctx {
    pub root: PathBuf,
    pub api_url: Option<String>,
    pub json: bool,
}

impl Ctx {
    pub fn config(&self) -> anyhow::Result<Config> {
        let mut config = Config::load(&self.root).context("failed to load config")?;
        if let Some(url) = &self.api_url {
            config.api.base_url = url.clone();
        }
        Ok(config)
    }

    pub fn client(&self) -> anyhow::Result<ApiClient> {
        Ok(ApiClient::from_config(&self.config()?))
    }

    /// Run `fut` to completion on a fresh runtime.
    pub fn block_on<F: Future>(&self, fut: F) -> anyhow::Result<F::Output> {
        let rt = tokio::runtime::Runtime::new().context("failed to start async runtime")?;
        Ok(rt.block_on(fut))
    }
}

/// Apply `command` to item `id` through a freshly loaded control panel and
/// print the item as the backend left it.
pub fn control<T: Remote + Serialize>(
    ctx: &Ctx,
    id: &str,
    command: ControlCommand,
) -> anyhow::Result<()> {
    let panel: ControlPanel<T> = ControlPanel::new(ctx.client()?, EventBus::default());
    let item = ctx
        .block_on(async {
            panel.refresh().await?;
            panel.run(id, command).await?;
            Ok::<_, ClientError>(panel.items().await.into_iter().find(|i| i.id() == id))
        })?
        .with_context(|| format!("failed to {command} {} '{id}'", T::ENTITY))?;

    match item {
        Some(item) if ctx.json => print_json(&item),
        Some(item) => {
            println!("{} [{id}] is now {}", capitalize(T::ENTITY), item.status());
            Ok(())
        }
        None if ctx.json => print_json(&serde_json::json!({ "id": id, "deleted": true })),
        None => {
            println!("Deleted {} [{id}]", T::ENTITY);
            Ok(())
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
