use crate::client::ApiClient;
use crate::error::{ClientError, Result};
use crate::events::{AppEvent, EventBus};
use cadence_core::abtest::AbTestDefinition;
use cadence_core::dashboard::{Dashboard, Filter, Listing};
use cadence_core::rule::{RuleDefinition, RuleRun};
use cadence_core::types::ControlCommand;
use cadence_core::workflow::WorkflowDefinition;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::sync::Arc;
use tokio::sync::Mutex;

/// REST binding for a dashboard entity.
pub trait Remote: Listing + Send + Sync + 'static {
    fn fetch_all(client: &ApiClient) -> BoxFuture<'_, Result<Vec<Self>>>;

    /// Send `command` for `item`. `item` is the optimistic copy (the prior
    /// copy for deletes). Returns the server's copy when it sends one.
    fn send<'a>(
        client: &'a ApiClient,
        item: &'a Self,
        command: ControlCommand,
    ) -> BoxFuture<'a, Result<Option<Self>>>;
}

fn unsupported<T: Listing>(command: ControlCommand) -> ClientError {
    ClientError::Core(cadence_core::CadenceError::UnsupportedCommand {
        command: command.to_string(),
        entity: T::ENTITY.to_string(),
    })
}

impl Remote for RuleDefinition {
    fn fetch_all(client: &ApiClient) -> BoxFuture<'_, Result<Vec<Self>>> {
        client.list_rules().boxed()
    }

    fn send<'a>(
        client: &'a ApiClient,
        item: &'a Self,
        command: ControlCommand,
    ) -> BoxFuture<'a, Result<Option<Self>>> {
        async move {
            let id = item.id_or_empty();
            match command {
                ControlCommand::Toggle => client.toggle_rule(id, item.enabled).await.map(Some),
                ControlCommand::Delete => client.delete_rule(id).await.map(|()| None),
                other => Err(unsupported::<Self>(other)),
            }
        }
        .boxed()
    }
}

impl Remote for WorkflowDefinition {
    fn fetch_all(client: &ApiClient) -> BoxFuture<'_, Result<Vec<Self>>> {
        client.list_workflows().boxed()
    }

    fn send<'a>(
        client: &'a ApiClient,
        item: &'a Self,
        command: ControlCommand,
    ) -> BoxFuture<'a, Result<Option<Self>>> {
        async move {
            let id = item.id_or_empty();
            match command {
                ControlCommand::Toggle => client.toggle_workflow(id, item.enabled).await.map(Some),
                ControlCommand::Start => client.start_workflow(id).await.map(Some),
                ControlCommand::Stop => client.stop_workflow(id).await.map(Some),
                ControlCommand::Delete => client.delete_workflow(id).await.map(|()| None),
                other => Err(unsupported::<Self>(other)),
            }
        }
        .boxed()
    }
}

impl Remote for AbTestDefinition {
    fn fetch_all(client: &ApiClient) -> BoxFuture<'_, Result<Vec<Self>>> {
        client.list_ab_tests().boxed()
    }

    fn send<'a>(
        client: &'a ApiClient,
        item: &'a Self,
        command: ControlCommand,
    ) -> BoxFuture<'a, Result<Option<Self>>> {
        async move {
            let id = item.id_or_empty();
            match command {
                ControlCommand::Start => client.start_ab_test(id).await.map(Some),
                ControlCommand::Stop => client.stop_ab_test(id).await.map(Some),
                ControlCommand::Delete => client.delete_ab_test(id).await.map(|()| None),
                other => Err(unsupported::<Self>(other)),
            }
        }
        .boxed()
    }
}

impl Remote for RuleRun {
    fn fetch_all(client: &ApiClient) -> BoxFuture<'_, Result<Vec<Self>>> {
        client.recent_runs(None).boxed()
    }

    fn send<'a>(
        client: &'a ApiClient,
        item: &'a Self,
        command: ControlCommand,
    ) -> BoxFuture<'a, Result<Option<Self>>> {
        async move {
            match command {
                ControlCommand::Retry => client.retry_run(&item.id).await.map(Some),
                other => Err(unsupported::<Self>(other)),
            }
        }
        .boxed()
    }
}

/// Dashboard controller: optimistic change, REST call, then commit or
/// rollback plus an error toast.
#[derive(Clone)]
pub struct ControlPanel<T> {
    client: ApiClient,
    events: EventBus,
    board: Arc<Mutex<Dashboard<T>>>,
}

impl<T: Remote> ControlPanel<T> {
    pub fn new(client: ApiClient, events: EventBus) -> Self {
        Self {
            client,
            events,
            board: Arc::new(Mutex::new(Dashboard::default())),
        }
    }

    /// Reload the list. A failed fetch keeps the current list and toasts.
    pub async fn refresh(&self) -> Result<()> {
        match T::fetch_all(&self.client).await {
            Ok(items) => {
                self.board.lock().await.replace_all(items);
                Ok(())
            }
            Err(e) => {
                tracing::warn!(entity = T::ENTITY, error = %e, "failed to load list");
                self.events.error(format!("Could not load {}s: {e}", T::ENTITY));
                Err(e)
            }
        }
    }

    pub async fn items(&self) -> Vec<T> {
        self.board.lock().await.items().to_vec()
    }

    pub async fn filtered(&self, filter: &Filter) -> Vec<T> {
        self.board
            .lock()
            .await
            .filtered(filter)
            .into_iter()
            .cloned()
            .collect()
    }

    pub async fn run(&self, id: &str, command: ControlCommand) -> Result<()> {
        let (change, item) = {
            let mut board = self.board.lock().await;
            let change = match board.begin(id, command) {
                Ok(change) => change,
                Err(e) => {
                    self.events.error(e.to_string());
                    return Err(e.into());
                }
            };
            let item = board
                .get(id)
                .cloned()
                .unwrap_or_else(|| change.prior().clone());
            (change, item)
        };
        self.events.publish(AppEvent::DataChanged {
            entity: T::ENTITY.to_string(),
        });

        match T::send(&self.client, &item, command).await {
            Ok(confirmed) => {
                self.board.lock().await.commit(change, confirmed);
                tracing::debug!(entity = T::ENTITY, id, %command, "control committed");
                Ok(())
            }
            Err(e) => {
                self.board.lock().await.rollback(change);
                tracing::warn!(entity = T::ENTITY, id, %command, error = %e, "control failed, rolled back");
                self.events
                    .error(format!("Could not {command} {} '{id}': {e}", T::ENTITY));
                self.events.publish(AppEvent::DataChanged {
                    entity: T::ENTITY.to_string(),
                });
                Err(e)
            }
        }
    }
}
