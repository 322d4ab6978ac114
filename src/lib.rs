pub mod aggregate;
pub mod applications;
pub mod catalog;
pub mod config;
pub mod error;
pub mod fetch;
pub mod kubeconfig;
pub mod models;

pub use aggregate::{aggregate, reconcile, Aggregator};
pub use config::Config;
pub use error::{Error, Result};
pub use models::k8s::{Application, Deployment, Environment, EnvironmentDeployments, List};
pub use tokio_util::sync::CancellationToken;

/// Connects using `config` and aggregates the catalog of the resolved dev
/// namespace. Returns that namespace together with the snapshot.
pub async fn run(config: &Config, cancel: &CancellationToken) -> Result<(String, List)> {
    let (client, context_namespace) = kubeconfig::build_client(config.context.as_deref()).await?;
    let namespace = config.resolve_namespace(context_namespace.as_deref());
    log::info!("aggregating applications from namespace {namespace}");

    let aggregator = Aggregator::for_cluster(client, config)?;
    let list = aggregator.run(&namespace, cancel).await?;
    Ok((namespace, list))
}
