//! Jenkins X custom resources read from the dev namespace.
//!
//! Only the fields the aggregator needs are modelled; everything else on the
//! objects is ignored on deserialization.

use kube::{CustomResource, ResourceExt};
use serde::{Deserialize, Serialize};

use crate::models::k8s;

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default)]
#[kube(
    group = "jenkins.io",
    version = "v1",
    kind = "Environment",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentSpec {
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default, rename = "pullRequestURL")]
    pub pull_request_url: String,
    #[serde(default)]
    pub order: i32,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub source: EnvironmentRepository,
    #[serde(default)]
    pub remote_cluster: bool,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default)]
pub struct EnvironmentRepository {
    #[serde(default)]
    pub url: String,
    #[serde(default, rename = "ref")]
    pub git_ref: String,
}

#[derive(CustomResource, Deserialize, Serialize, Clone, Debug, Default)]
#[kube(
    group = "jenkins.io",
    version = "v1",
    kind = "SourceRepository",
    namespaced,
    schema = "disabled"
)]
#[serde(rename_all = "camelCase")]
pub struct SourceRepositorySpec {
    #[serde(default)]
    pub org: String,
    #[serde(default)]
    pub repo: String,
    #[serde(default)]
    pub provider: String,
    #[serde(default, rename = "httpCloneURL")]
    pub http_clone_url: String,
    #[serde(default)]
    pub url: String,
}

impl From<Environment> for k8s::Environment {
    fn from(env: Environment) -> Self {
        let name = env.name_any();
        let spec = env.spec;
        k8s::Environment {
            name,
            namespace: spec.namespace,
            kind: k8s::EnvironmentKind::from(spec.kind),
            is_remote_cluster: spec.remote_cluster,
            source_repo_url: spec.source.url,
            label: spec.label,
            order: spec.order,
            pull_request_url: spec.pull_request_url,
        }
    }
}

impl From<SourceRepository> for k8s::SourceRepository {
    fn from(sr: SourceRepository) -> Self {
        let name = sr.name_any();
        let spec = sr.spec;
        let url = if spec.url.is_empty() {
            spec.http_clone_url
        } else {
            spec.url
        };
        k8s::SourceRepository {
            name,
            org: spec.org,
            repo: spec.repo,
            url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_resource_converts_to_domain() {
        let env: Environment = serde_json::from_value(serde_json::json!({
            "apiVersion": "jenkins.io/v1",
            "kind": "Environment",
            "metadata": { "name": "production", "namespace": "jx" },
            "spec": {
                "namespace": "jx-production",
                "kind": "Permanent",
                "order": 200,
                "remoteCluster": true,
                "promotionStrategy": "Manual",
                "source": { "url": "https://github.com/acme/jx-prod.git", "ref": "main" }
            }
        }))
        .unwrap();

        let env = k8s::Environment::from(env);
        assert_eq!(env.name, "production");
        assert_eq!(env.namespace, "jx-production");
        assert_eq!(env.kind, k8s::EnvironmentKind::Permanent);
        assert!(env.is_remote_cluster);
        assert_eq!(env.source_repo_url, "https://github.com/acme/jx-prod.git");
        assert_eq!(env.order, 200);
    }

    #[test]
    fn source_repository_falls_back_to_clone_url() {
        let sr: SourceRepository = serde_json::from_value(serde_json::json!({
            "apiVersion": "jenkins.io/v1",
            "kind": "SourceRepository",
            "metadata": { "name": "acme-myapp" },
            "spec": {
                "org": "acme",
                "repo": "myapp",
                "httpCloneURL": "https://github.com/acme/myapp.git"
            }
        }))
        .unwrap();

        let sr = k8s::SourceRepository::from(sr);
        assert_eq!(sr.name, "acme-myapp");
        assert_eq!(sr.repo, "myapp");
        assert_eq!(sr.url, "https://github.com/acme/myapp.git");
    }
}
