//! Reconciling fetched deployments against the application catalog.
use std::sync::Arc;

use kube::Client;
use tokio_util::sync::CancellationToken;

use crate::catalog::{Catalog, CatalogReader, KubeCatalog};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{DeploymentFetcher, DeploymentsByEnvironment, GitCli, KubeClusterApi};
use crate::models::k8s::{Environment, EnvironmentDeployments, List, SourceRepository};

/// Builds the application list from raw catalog data and fetched deployments.
pub fn aggregate(
    repositories: &[SourceRepository],
    environments: &[Environment],
    deployments: &DeploymentsByEnvironment,
) -> List {
    reconcile(&Catalog::build(repositories, environments), deployments)
}

/// Attaches to each application every non-canary deployment whose resolved
/// name equals the application name, per permanent environment.
///
/// Environments without a match are left out of the application's map, and
/// several matches in one environment are all kept.
pub fn reconcile(catalog: &Catalog, deployments: &DeploymentsByEnvironment) -> List {
    let mut items = catalog.applications.clone();
    for app in &mut items {
        for env in &catalog.permanent {
            let Some(fetched) = deployments.get(&env.name) else {
                continue;
            };
            let matched: Vec<_> = fetched
                .iter()
                .filter(|d| d.name == app.name && !d.canary)
                .cloned()
                .collect();
            if matched.is_empty() {
                continue;
            }
            if matched.len() > 1 {
                log::debug!(
                    "aggregate: {} deployments of {} in {}",
                    matched.len(),
                    app.name,
                    env.name
                );
            }
            app.environments.insert(
                env.name.clone(),
                EnvironmentDeployments {
                    environment: env.clone(),
                    deployments: matched,
                },
            );
        }
    }
    List { items }
}

/// Runs one complete aggregation: catalog read, fetch, reconcile.
#[derive(Clone)]
pub struct Aggregator {
    catalog: Arc<dyn CatalogReader>,
    fetcher: DeploymentFetcher,
}

impl Aggregator {
    pub fn new(catalog: Arc<dyn CatalogReader>, fetcher: DeploymentFetcher) -> Self {
        Self { catalog, fetcher }
    }

    /// Aggregator backed by the cluster API and the `git` command line.
    pub fn for_cluster(client: Client, config: &Config) -> Result<Self> {
        let cloner = GitCli::new(config.git_binary.as_deref(), config.clone_arg_list()?);
        let fetcher = DeploymentFetcher::new(
            Arc::new(KubeClusterApi::new(client.clone())),
            Arc::new(cloner),
        )
        .with_report_path(config.report_path.clone())
        .with_concurrency(config.fetch_concurrency);
        Ok(Self::new(Arc::new(KubeCatalog::new(client)), fetcher))
    }

    /// Snapshot of every application in the catalog of `namespace`.
    pub async fn run(&self, namespace: &str, cancel: &CancellationToken) -> Result<List> {
        let catalog = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            catalog = Catalog::read(self.catalog.as_ref(), namespace) => catalog?,
        };

        let deployments = self.fetcher.fetch_all(&catalog.permanent, cancel).await?;
        let list = reconcile(&catalog, &deployments);
        log::info!(
            "aggregate: {} application(s), {} deployed somewhere",
            list.items.len(),
            list.items.iter().filter(|a| !a.environments.is_empty()).count()
        );
        Ok(list)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::k8s::{Deployment, EnvironmentKind};
    use std::collections::HashMap;

    fn repo(name: &str) -> SourceRepository {
        SourceRepository {
            name: name.into(),
            org: "acme".into(),
            repo: name.into(),
            url: format!("https://github.com/acme/{name}.git"),
        }
    }

    fn env(name: &str, kind: EnvironmentKind) -> Environment {
        Environment {
            name: name.into(),
            namespace: format!("jx-{name}"),
            kind,
            ..Default::default()
        }
    }

    fn dep(name: &str, canary: bool) -> Deployment {
        Deployment {
            name: name.into(),
            canary,
            ..Default::default()
        }
    }

    #[test]
    fn single_match() {
        let deployments = HashMap::from([("staging".to_string(), vec![dep("myapp", false)])]);
        let list = aggregate(
            &[repo("myapp")],
            &[env("staging", EnvironmentKind::Permanent)],
            &deployments,
        );

        assert_eq!(list.items.len(), 1);
        let app = &list.items[0];
        assert_eq!(app.name, "myapp");
        assert_eq!(app.environments.len(), 1);
        let staging = &app.environments["staging"];
        assert_eq!(staging.environment.namespace, "jx-staging");
        assert_eq!(staging.deployments, vec![dep("myapp", false)]);
    }

    #[test]
    fn canary_deployments_never_match() {
        let deployments = HashMap::from([("staging".to_string(), vec![dep("myapp", true)])]);
        let list = aggregate(
            &[repo("myapp")],
            &[env("staging", EnvironmentKind::Permanent)],
            &deployments,
        );
        assert_eq!(list.items.len(), 1);
        assert!(list.items[0].environments.is_empty());
    }

    #[test]
    fn keeps_every_non_canary_match() {
        let deployments = HashMap::from([(
            "staging".to_string(),
            vec![dep("myapp", false), dep("myapp", true), dep("myapp", false), dep("other", false)],
        )]);
        let list = aggregate(
            &[repo("myapp")],
            &[env("staging", EnvironmentKind::Permanent)],
            &deployments,
        );
        assert_eq!(list.items[0].environments["staging"].deployments.len(), 2);
    }

    #[test]
    fn matches_across_environments() {
        let deployments = HashMap::from([
            ("staging".to_string(), vec![dep("myapp", false)]),
            ("production".to_string(), vec![dep("myapp", false)]),
        ]);
        let list = aggregate(
            &[repo("myapp"), repo("unused")],
            &[
                env("staging", EnvironmentKind::Permanent),
                env("production", EnvironmentKind::Permanent),
            ],
            &deployments,
        );
        assert_eq!(list.items.len(), 2);
        assert_eq!(list.items[0].environments.len(), 2);
        assert!(list.items[1].environments.is_empty());
        assert_eq!(list.environments().len(), 2);
    }

    #[test]
    fn ignores_deployments_of_non_permanent_environments() {
        let deployments = HashMap::from([("pr-7".to_string(), vec![dep("myapp", false)])]);
        let list = aggregate(
            &[repo("myapp")],
            &[env("pr-7", EnvironmentKind::Preview)],
            &deployments,
        );
        assert!(list.items[0].environments.is_empty());
    }

    #[test]
    fn empty_inputs() {
        let list = aggregate(&[], &[], &HashMap::new());
        assert!(list.is_empty());
    }

    #[test]
    fn aggregation_is_idempotent() {
        let repos = [repo("myapp"), repo("other")];
        let envs = [
            env("staging", EnvironmentKind::Permanent),
            env("production", EnvironmentKind::Permanent),
        ];
        let deployments = HashMap::from([
            ("staging".to_string(), vec![dep("myapp", false), dep("other", false)]),
            ("production".to_string(), vec![dep("myapp", false)]),
        ]);

        let first = aggregate(&repos, &envs, &deployments);
        let second = aggregate(&repos, &envs, &deployments);
        assert_eq!(first, second);
        assert_eq!(
            serde_json::to_string(&first).unwrap(),
            serde_json::to_string(&second).unwrap()
        );
    }
}
