//! Reading the environment and repository catalogs from the dev namespace.
use async_trait::async_trait;
use kube::api::{Api, ListParams};
use kube::Client;

use crate::applications::naming::{parse_git_url, to_valid_name};
use crate::error::{Error, Result};
use crate::models::crd;
use crate::models::k8s::{Application, Environment, SourceRepository};

/// Source of the repository and environment catalogs.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn list_source_repositories(&self, namespace: &str) -> Result<Vec<SourceRepository>>;

    /// Environments ordered by `order`, then name.
    async fn list_environments(&self, namespace: &str) -> Result<Vec<Environment>>;
}

/// Reads `jenkins.io/v1` custom resources through the cluster API.
#[derive(Clone)]
pub struct KubeCatalog {
    client: Client,
}

impl KubeCatalog {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CatalogReader for KubeCatalog {
    async fn list_source_repositories(&self, namespace: &str) -> Result<Vec<SourceRepository>> {
        let api: Api<crd::SourceRepository> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::CatalogRead {
                what: "source repository",
                namespace: namespace.to_string(),
                source: Box::new(e),
            })?;
        log::debug!(
            "catalog: {} source repositories in {namespace}",
            list.items.len()
        );
        Ok(list.items.into_iter().map(SourceRepository::from).collect())
    }

    async fn list_environments(&self, namespace: &str) -> Result<Vec<Environment>> {
        let api: Api<crd::Environment> = Api::namespaced(self.client.clone(), namespace);
        let list = api
            .list(&ListParams::default())
            .await
            .map_err(|e| Error::CatalogRead {
                what: "environment",
                namespace: namespace.to_string(),
                source: Box::new(e),
            })?;
        let mut envs: Vec<Environment> = list.items.into_iter().map(Environment::from).collect();
        sort_environments(&mut envs);
        Ok(envs)
    }
}

pub fn sort_environments(envs: &mut [Environment]) {
    envs.sort_by(|a, b| a.order.cmp(&b.order).then_with(|| a.name.cmp(&b.name)));
}

/// Candidate applications and the environments they are matched against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Catalog {
    /// Permanent environments, including `Development`
    pub permanent: Vec<Environment>,
    /// One entry per repository that does not back an environment
    pub applications: Vec<Application>,
}

impl Catalog {
    pub fn build(repositories: &[SourceRepository], environments: &[Environment]) -> Self {
        let permanent: Vec<Environment> = environments
            .iter()
            .filter(|env| env.kind.is_permanent())
            .cloned()
            .collect();

        let applications = repositories
            .iter()
            .filter(|repo| {
                let backs_env = backs_environment(repo, environments);
                if backs_env {
                    log::debug!("catalog: {}/{} backs an environment, skipping", repo.org, repo.repo);
                }
                !backs_env
            })
            .map(|repo| Application {
                name: to_valid_name(&repo.repo),
                source_repository: repo.clone(),
                environments: Default::default(),
            })
            .collect();

        Self {
            permanent,
            applications,
        }
    }

    /// Reads both catalogs from `namespace` and builds the candidate set.
    pub async fn read(reader: &dyn CatalogReader, namespace: &str) -> Result<Self> {
        let repositories = reader.list_source_repositories(namespace).await?;
        let environments = reader.list_environments(namespace).await?;
        let catalog = Self::build(&repositories, &environments);
        log::info!(
            "catalog: {} application(s), {} permanent environment(s) in {namespace}",
            catalog.applications.len(),
            catalog.permanent.len()
        );
        Ok(catalog)
    }
}

/// True when `repo` is the gitops repository of one of `environments`.
fn backs_environment(repo: &SourceRepository, environments: &[Environment]) -> bool {
    environments
        .iter()
        .filter_map(|env| parse_git_url(&env.source_repo_url))
        .any(|git| {
            git.name.eq_ignore_ascii_case(&repo.repo) && git.owner.eq_ignore_ascii_case(&repo.org)
        })
}
