//! Deployment state read live from the cluster API.
use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment as KubeDeployment;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{Api, ListParams};
use kube::Client;

use crate::applications::{extract_version, is_canary_auxiliary, normalize};
use crate::error::{BoxError, Error, Result};
use crate::models::k8s::{Deployment, Environment};

/// Annotation carrying a service's externally exposed URL.
pub const EXPOSE_URL_ANNOTATION: &str = "fabric8.io/exposeUrl";
/// Annotation overriding the public host of an ingress.
pub const INGRESS_HOST_ANNOTATION: &str = "jenkins.io/host";

/// The slice of the cluster API the live fetcher needs.
#[async_trait]
pub trait ClusterApi: Send + Sync {
    async fn list_deployments(
        &self,
        namespace: &str,
    ) -> std::result::Result<Vec<KubeDeployment>, BoxError>;

    /// External URL of the service or ingress named `app_name`, if any.
    async fn find_service_url(&self, namespace: &str, app_name: &str) -> Option<String>;
}

#[derive(Clone)]
pub struct KubeClusterApi {
    client: Client,
}

impl KubeClusterApi {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterApi for KubeClusterApi {
    async fn list_deployments(
        &self,
        namespace: &str,
    ) -> std::result::Result<Vec<KubeDeployment>, BoxError> {
        let api: Api<KubeDeployment> = Api::namespaced(self.client.clone(), namespace);
        let list = api.list(&ListParams::default()).await?;
        Ok(list.items)
    }

    async fn find_service_url(&self, namespace: &str, app_name: &str) -> Option<String> {
        let services: Api<Service> = Api::namespaced(self.client.clone(), namespace);
        match services.get_opt(app_name).await {
            Ok(Some(svc)) => {
                if let Some(url) = service_url(&svc) {
                    return Some(url);
                }
            }
            Ok(None) => {}
            Err(e) => log::debug!("fetch: service {namespace}/{app_name}: {e}"),
        }

        let ingresses: Api<Ingress> = Api::namespaced(self.client.clone(), namespace);
        match ingresses.get_opt(app_name).await {
            Ok(Some(ing)) => ingress_url(&ing),
            Ok(None) => None,
            Err(e) => {
                log::debug!("fetch: ingress {namespace}/{app_name}: {e}");
                None
            }
        }
    }
}

/// URL from the expose annotation or a load balancer ingress point.
pub fn service_url(svc: &Service) -> Option<String> {
    if let Some(url) = svc
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(EXPOSE_URL_ANNOTATION))
        .filter(|url| !url.is_empty())
    {
        return Some(url.clone());
    }

    let spec = svc.spec.as_ref()?;
    if spec.type_.as_deref() != Some("LoadBalancer") {
        return None;
    }
    let scheme = if spec.ports.iter().flatten().any(|p| p.port == 443) {
        "https"
    } else {
        "http"
    };
    svc.status
        .as_ref()?
        .load_balancer
        .as_ref()?
        .ingress
        .iter()
        .flatten()
        .find_map(|ing| {
            ing.ip
                .as_deref()
                .filter(|ip| !ip.is_empty())
                .or(ing.hostname.as_deref().filter(|h| !h.is_empty()))
        })
        .map(|host| format!("{scheme}://{host}/"))
}

/// URL from the first rule of an ingress, preferring TLS hosts.
pub fn ingress_url(ing: &Ingress) -> Option<String> {
    let spec = ing.spec.as_ref()?;
    let rule = spec.rules.as_ref()?.first()?;

    let tls_host = spec
        .tls
        .iter()
        .flatten()
        .flat_map(|tls| tls.hosts.iter().flatten())
        .find(|h| !h.is_empty());
    if let Some(host) = tls_host {
        return Some(format!("https://{host}"));
    }

    if let Some(host) = ing
        .metadata
        .annotations
        .as_ref()
        .and_then(|a| a.get(INGRESS_HOST_ANNOTATION))
        .filter(|h| !h.is_empty())
    {
        return Some(format!("https://{host}"));
    }

    let host = rule.host.as_deref().filter(|h| !h.is_empty())?;
    let path = rule
        .http
        .as_ref()
        .and_then(|http| http.paths.first())
        .and_then(|p| p.path.as_deref())
        .unwrap_or("");
    Some(format!("http://{host}{path}"))
}

/// `ready/desired`, or empty when desired is unset or nothing is ready.
pub fn pods_ratio(d: &KubeDeployment) -> String {
    let ready = d
        .status
        .as_ref()
        .and_then(|s| s.ready_replicas)
        .unwrap_or(0);
    let desired = d.spec.as_ref().and_then(|s| s.replicas);
    match desired {
        Some(desired) if ready > 0 => format!("{ready}/{desired}"),
        _ => String::new(),
    }
}

/// Flattens a label selector into a plain map.
///
/// Only `In` expressions with exactly one value have a map form; every other
/// expression is an error.
pub fn selector_as_map(
    selector: &LabelSelector,
) -> std::result::Result<BTreeMap<String, String>, String> {
    let mut map = selector.match_labels.clone().unwrap_or_default();
    for expr in selector.match_expressions.iter().flatten() {
        match (expr.operator.as_str(), expr.values.as_deref()) {
            ("In", Some([value])) => {
                map.insert(expr.key.clone(), value.clone());
            }
            ("In", _) => {
                return Err(format!(
                    "operator In on {:?} without a single value cannot be converted into a map",
                    expr.key
                ))
            }
            ("NotIn" | "Exists" | "DoesNotExist", _) => {
                return Err(format!(
                    "operator {} on {:?} cannot be converted into a map",
                    expr.operator, expr.key
                ))
            }
            (op, _) => return Err(format!("{op:?} is not a valid selector operator")),
        }
    }
    Ok(map)
}

/// Builds the domain record for one deployment, without its URL.
///
/// The name comes from the controller name with the deployment's namespace
/// stripped, then from the selector's `app` label when one is set.
pub fn to_deployment(d: &KubeDeployment, env: &Environment) -> Result<Deployment> {
    let raw_name = d.metadata.name.as_deref().unwrap_or("");
    let namespace = d.metadata.namespace.as_deref().unwrap_or(&env.namespace);
    let mut name = normalize(raw_name, &[namespace]);

    if let Some(spec) = d.spec.as_ref() {
        let selector =
            selector_as_map(&spec.selector).map_err(|reason| Error::SelectorResolution {
                environment: env.name.clone(),
                namespace: env.namespace.clone(),
                deployment: raw_name.to_string(),
                reason,
            })?;
        let app = normalize(
            selector.get("app").map(String::as_str).unwrap_or(""),
            &[env.namespace.as_str()],
        );
        if !app.is_empty() {
            name = app;
        }
    }

    let labels = d.metadata.labels.clone().unwrap_or_default();
    let owners = d.metadata.owner_references.as_deref().unwrap_or(&[]);
    Ok(Deployment {
        name,
        pods: pods_ratio(d),
        version: extract_version(&labels),
        url: String::new(),
        canary: is_canary_auxiliary(owners),
    })
}

/// Lists and converts every deployment in the environment's namespace.
pub async fn fetch_live(api: &dyn ClusterApi, env: &Environment) -> Result<Vec<Deployment>> {
    let items = api
        .list_deployments(&env.namespace)
        .await
        .map_err(|source| Error::DeploymentList {
            environment: env.name.clone(),
            namespace: env.namespace.clone(),
            source,
        })?;

    let mut deployments = Vec::with_capacity(items.len());
    for d in &items {
        let mut deployment = to_deployment(d, env)?;
        deployment.url = api
            .find_service_url(&env.namespace, &deployment.name)
            .await
            .unwrap_or_default();
        deployments.push(deployment);
    }
    log::debug!(
        "fetch: {} deployment(s) in {} ({})",
        deployments.len(),
        env.name,
        env.namespace
    );
    Ok(deployments)
}
