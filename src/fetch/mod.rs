//! Per-environment deployment fetching.
pub mod live;
pub mod remote;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use futures_util::stream::{self, StreamExt, TryStreamExt};
use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};
use crate::models::k8s::{Deployment, Environment};
use crate::models::release_report::RELEASE_REPORT_PATH;

pub use live::{ClusterApi, KubeClusterApi};
pub use remote::{GitCli, RepositoryCloner};

/// Fetched deployments keyed by environment name.
pub type DeploymentsByEnvironment = HashMap<String, Vec<Deployment>>;

/// Chooses the live or remote strategy per environment and fans fetches out
/// with a bounded number in flight.
#[derive(Clone)]
pub struct DeploymentFetcher {
    cluster: Arc<dyn ClusterApi>,
    cloner: Arc<dyn RepositoryCloner>,
    report_path: PathBuf,
    concurrency: usize,
}

impl DeploymentFetcher {
    pub fn new(cluster: Arc<dyn ClusterApi>, cloner: Arc<dyn RepositoryCloner>) -> Self {
        Self {
            cluster,
            cloner,
            report_path: PathBuf::from(RELEASE_REPORT_PATH),
            concurrency: 4,
        }
    }

    pub fn with_report_path(mut self, report_path: impl Into<PathBuf>) -> Self {
        self.report_path = report_path.into();
        self
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Deployments of a single environment.
    pub async fn fetch(&self, env: &Environment) -> Result<Vec<Deployment>> {
        if env.is_remote_cluster {
            remote::fetch_remote(self.cloner.as_ref(), env, &self.report_path).await
        } else {
            live::fetch_live(self.cluster.as_ref(), env).await
        }
    }

    /// Fetches every fetchable environment in `envs`.
    ///
    /// Returns only once all fetches finished. The first failure or a
    /// cancellation drops the fetches still in flight and no partial map is
    /// returned.
    pub async fn fetch_all(
        &self,
        envs: &[Environment],
        cancel: &CancellationToken,
    ) -> Result<DeploymentsByEnvironment> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let targets: Vec<&Environment> = envs.iter().filter(|env| env.is_fetchable()).collect();
        log::info!(
            "fetch: {} environment(s), at most {} at a time",
            targets.len(),
            self.concurrency
        );

        let fetches = stream::iter(targets)
            .map(|env| async move {
                let deployments = self.fetch(env).await?;
                Ok::<_, Error>((env.name.clone(), deployments))
            })
            .buffer_unordered(self.concurrency)
            .try_collect::<DeploymentsByEnvironment>();

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                log::warn!("fetch: cancelled, dropping in-flight fetches");
                Err(Error::Cancelled)
            }
            result = fetches => result,
        }
    }
}
