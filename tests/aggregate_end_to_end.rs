use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment as KubeDeployment, DeploymentSpec, DeploymentStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta, OwnerReference};

use jx_application::catalog::{sort_environments, CatalogReader};
use jx_application::error::BoxError;
use jx_application::fetch::{ClusterApi, DeploymentFetcher, RepositoryCloner};
use jx_application::models::k8s::{EnvironmentKind, SourceRepository};
use jx_application::{Aggregator, CancellationToken, Environment, Error};

struct FakeCatalog {
    repositories: Vec<SourceRepository>,
    environments: Vec<Environment>,
    broken: bool,
}

#[async_trait]
impl CatalogReader for FakeCatalog {
    async fn list_source_repositories(
        &self,
        namespace: &str,
    ) -> jx_application::Result<Vec<SourceRepository>> {
        if self.broken {
            return Err(Error::CatalogRead {
                what: "source repository",
                namespace: namespace.to_string(),
                source: "the server could not find the requested resource".into(),
            });
        }
        Ok(self.repositories.clone())
    }

    async fn list_environments(&self, _namespace: &str) -> jx_application::Result<Vec<Environment>> {
        let mut envs = self.environments.clone();
        sort_environments(&mut envs);
        Ok(envs)
    }
}

#[derive(Default)]
struct FakeCluster {
    deployments: HashMap<String, Vec<KubeDeployment>>,
}

#[async_trait]
impl ClusterApi for FakeCluster {
    async fn list_deployments(&self, namespace: &str) -> Result<Vec<KubeDeployment>, BoxError> {
        Ok(self.deployments.get(namespace).cloned().unwrap_or_default())
    }

    async fn find_service_url(&self, namespace: &str, app_name: &str) -> Option<String> {
        Some(format!("http://{app_name}.{namespace}.example.com"))
    }
}

/// Clones an empty repository: no release report is ever present.
struct EmptyRepository;

#[async_trait]
impl RepositoryCloner for EmptyRepository {
    async fn clone_to_dir(&self, _git_url: &str, dir: &Path) -> Result<(), BoxError> {
        std::fs::create_dir_all(dir.join(".git"))?;
        Ok(())
    }
}

fn deployment(name: &str, namespace: &str, version: &str, canary: bool) -> KubeDeployment {
    KubeDeployment {
        metadata: ObjectMeta {
            name: Some(name.into()),
            namespace: Some(namespace.into()),
            labels: Some(BTreeMap::from([("version".into(), version.into())])),
            owner_references: canary.then(|| {
                vec![OwnerReference {
                    kind: "Canary".into(),
                    name: name.into(),
                    ..Default::default()
                }]
            }),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector::default(),
            ..Default::default()
        }),
        status: Some(DeploymentStatus {
            ready_replicas: Some(1),
            ..Default::default()
        }),
    }
}

fn environment(name: &str, kind: EnvironmentKind, order: i32) -> Environment {
    Environment {
        name: name.into(),
        namespace: format!("jx-{name}"),
        kind,
        order,
        ..Default::default()
    }
}

fn repository(org: &str, repo: &str) -> SourceRepository {
    SourceRepository {
        name: format!("{org}-{repo}"),
        org: org.into(),
        repo: repo.into(),
        url: format!("https://github.com/{org}/{repo}.git"),
    }
}

fn setup(staging: Vec<KubeDeployment>, broken: bool) -> Aggregator {
    let mut dev = environment("dev", EnvironmentKind::Development, 0);
    dev.source_repo_url = "https://github.com/acme/jx3-cluster.git".into();
    let mut production = environment("production", EnvironmentKind::Permanent, 200);
    production.is_remote_cluster = true;
    production.source_repo_url = "https://github.com/acme/jx-prod.git".into();

    let catalog = FakeCatalog {
        repositories: vec![repository("acme", "jx3-cluster"), repository("acme", "myapp")],
        environments: vec![
            production,
            environment("staging", EnvironmentKind::Permanent, 100),
            environment("pr-3", EnvironmentKind::Preview, 0),
            dev,
        ],
        broken,
    };
    let cluster = FakeCluster {
        deployments: HashMap::from([("jx-staging".to_string(), staging)]),
    };
    let fetcher = DeploymentFetcher::new(Arc::new(cluster), Arc::new(EmptyRepository));
    Aggregator::new(Arc::new(catalog), fetcher)
}

#[tokio::test]
async fn staging_deployment_is_matched() {
    let _ = env_logger::builder().is_test(true).try_init();
    let aggregator = setup(
        vec![deployment("jx-staging-myapp", "jx-staging", "0.0.12", false)],
        false,
    );

    let list = aggregator
        .run("jx", &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(list.items.len(), 1, "the cluster repository is not an application");
    let app = &list.items[0];
    assert_eq!(app.name, "myapp");
    assert_eq!(app.environments.keys().collect::<Vec<_>>(), vec!["staging"]);

    let staging = &app.environments["staging"];
    assert_eq!(staging.deployments.len(), 1);
    let d = &staging.deployments[0];
    assert_eq!(d.name, "myapp");
    assert_eq!(d.version, "0.0.12");
    assert_eq!(d.pods, "1/1");
    assert_eq!(d.url, "http://myapp.jx-staging.example.com");
    assert!(!d.canary);
}

#[tokio::test]
async fn canary_deployment_is_not_matched() {
    let aggregator = setup(
        vec![deployment("myapp", "jx-staging", "0.0.12", true)],
        false,
    );
    let list = aggregator
        .run("jx", &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(list.items.len(), 1);
    assert!(list.items[0].environments.is_empty());
}

#[tokio::test]
async fn remote_environment_without_report_has_no_deployments() {
    let aggregator = setup(Vec::new(), false);
    let list = aggregator
        .run("jx", &CancellationToken::new())
        .await
        .unwrap();
    assert!(list.items.iter().all(|a| a.environments.is_empty()));
}

#[tokio::test]
async fn repeated_runs_produce_identical_snapshots() {
    let aggregator = setup(
        vec![
            deployment("myapp", "jx-staging", "1.0.0", false),
            deployment("myapp-primary", "jx-staging", "1.0.0", true),
        ],
        false,
    );
    let cancel = CancellationToken::new();
    let first = aggregator.run("jx", &cancel).await.unwrap();
    let second = aggregator.run("jx", &cancel).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn catalog_failure_aborts_the_run() {
    let aggregator = setup(Vec::new(), true);
    let err = aggregator
        .run("jx", &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::CatalogRead { .. }));
    assert_eq!(err.namespace(), Some("jx"));
}

#[tokio::test]
async fn cancelled_run_returns_no_result() {
    let aggregator = setup(Vec::new(), false);
    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = aggregator.run("jx", &cancel).await.unwrap_err();
    assert!(matches!(err, Error::Cancelled));
}
