use super::{GatewayCluster, GatewayState, GatewaySync, SyncError};
use crate::config::RequeueConfig;
use crate::k8s::resources::{
    CollectorSettings, CollectorsGroup, DestinationResource, ProcessorResource,
};
use futures::channel::mpsc;
use futures::{stream, StreamExt};
use k8s_openapi::api::apps::v1::Deployment;
use kube::runtime::controller::{Action, Controller};
use kube::runtime::{watcher, WatchStreamExt};
use kube::{Api, Client, ResourceExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

struct Context<C> {
    sync: GatewaySync<C>,
    requeue: RequeueConfig,
}

/// Runs the gateway controller until a termination signal is received.
///
/// Gateway collectors groups and their deployments are watched directly. Changes to any
/// destination, processor or settings object trigger a pass over every collectors group since
/// they all feed the same gateway configuration.
pub async fn run<C>(client: Client, namespace: &str, sync: GatewaySync<C>, requeue: RequeueConfig)
where
    C: GatewayCluster + Send + Sync + 'static,
{
    let groups: Api<CollectorsGroup> = Api::namespaced(client.clone(), namespace);
    let deployments: Api<Deployment> = Api::namespaced(client.clone(), namespace);
    let destinations: Api<DestinationResource> = Api::namespaced(client.clone(), namespace);
    let processors: Api<ProcessorResource> = Api::namespaced(client.clone(), namespace);
    let settings: Api<CollectorSettings> = Api::namespaced(client, namespace);

    let mut inputs_changed = stream::select_all([
        watcher(destinations, watcher::Config::default())
            .default_backoff()
            .map(|_| ())
            .boxed(),
        watcher(processors, watcher::Config::default())
            .default_backoff()
            .map(|_| ())
            .boxed(),
        watcher(settings, watcher::Config::default())
            .default_backoff()
            .map(|_| ())
            .boxed(),
    ]);
    // A full channel means a pass over every group is already pending.
    let (mut trigger_tx, trigger_rx) = mpsc::channel::<()>(1);
    tokio::spawn(async move {
        while inputs_changed.next().await.is_some() {
            if trigger_tx.try_send(()).is_err() && trigger_tx.is_closed() {
                break;
            }
        }
    });

    info!(namespace, "starting collector gateway controller");
    Controller::new(groups, watcher::Config::default())
        .owns(deployments, watcher::Config::default())
        .reconcile_all_on(trigger_rx)
        .shutdown_on_signal()
        .run(reconcile, error_policy, Arc::new(Context { sync, requeue }))
        .for_each(|result| async move {
            match result {
                Ok((obj, _)) => debug!(name = %obj.name, "reconciled"),
                Err(err) => warn!("reconcile failed: {err}"),
            }
        })
        .await;
    info!("collector gateway controller stopped");
}

async fn reconcile<C>(
    group: Arc<CollectorsGroup>,
    ctx: Arc<Context<C>>,
) -> Result<Action, SyncError>
where
    C: GatewayCluster,
{
    if !group.is_gateway() {
        debug!(name = %group.name_any(), "collectors group without the gateway role, ignoring");
        return Ok(Action::await_change());
    }

    match ctx.sync.sync().await? {
        GatewayState::NoGateway => Ok(Action::await_change()),
        GatewayState::Synced { .. } => Ok(Action::requeue(ctx.requeue.resync)),
    }
}

fn error_policy<C>(group: Arc<CollectorsGroup>, err: &SyncError, ctx: Arc<Context<C>>) -> Action {
    warn!(
        name = %group.name_any(),
        retry_in = ?ctx.requeue.error_backoff,
        "gateway sync failed: {err}"
    );
    Action::requeue(ctx.requeue.error_backoff)
}
