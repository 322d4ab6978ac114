// Domain model produced by an aggregation run
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Kind of a Jenkins X environment.
///
/// Parsed leniently: an empty or unrecognised kind is treated as `Permanent`,
/// which is how Jenkins X itself defaults the field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EnvironmentKind {
    Development,
    #[default]
    Permanent,
    Preview,
    Test,
    Edit,
}

impl EnvironmentKind {
    /// Long-lived environments: everything except the ephemeral kinds.
    /// `Development` counts as permanent but is never fetched from.
    pub fn is_permanent(self) -> bool {
        !matches!(
            self,
            EnvironmentKind::Preview | EnvironmentKind::Test | EnvironmentKind::Edit
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnvironmentKind::Development => "Development",
            EnvironmentKind::Permanent => "Permanent",
            EnvironmentKind::Preview => "Preview",
            EnvironmentKind::Test => "Test",
            EnvironmentKind::Edit => "Edit",
        }
    }
}

impl From<&str> for EnvironmentKind {
    fn from(value: &str) -> Self {
        match value {
            "Development" => EnvironmentKind::Development,
            "Preview" => EnvironmentKind::Preview,
            "Test" => EnvironmentKind::Test,
            "Edit" => EnvironmentKind::Edit,
            _ => EnvironmentKind::Permanent,
        }
    }
}

impl From<String> for EnvironmentKind {
    fn from(value: String) -> Self {
        EnvironmentKind::from(value.as_str())
    }
}

impl From<EnvironmentKind> for String {
    fn from(kind: EnvironmentKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for EnvironmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub name: String,
    pub namespace: String,
    pub kind: EnvironmentKind,
    /// Deployment state lives in a committed release report rather than the live API
    pub is_remote_cluster: bool,
    /// Git URL of the environment's own gitops repository
    pub source_repo_url: String,
    pub label: String,
    pub order: i32,
    /// Only set on preview environments
    pub pull_request_url: String,
}

impl Environment {
    pub fn is_preview(&self) -> bool {
        self.kind == EnvironmentKind::Preview
    }

    /// Environments whose deployments are fetched and matched.
    pub fn is_fetchable(&self) -> bool {
        self.kind.is_permanent() && self.kind != EnvironmentKind::Development
    }
}

/// A repository registered in the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceRepository {
    /// Name of the catalog entry itself
    pub name: String,
    pub org: String,
    pub repo: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub name: String,
    /// `ready/desired`, empty when nothing is ready or desired is unset
    pub pods: String,
    pub version: String,
    pub url: String,
    /// Auxiliary deployment created by a canary controller
    pub canary: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentDeployments {
    pub environment: Environment,
    pub deployments: Vec<Deployment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub name: String,
    pub source_repository: SourceRepository,
    /// Keyed by environment name; environments without a match are absent
    pub environments: BTreeMap<String, EnvironmentDeployments>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct List {
    #[serde(rename = "applications")]
    pub items: Vec<Application>,
}

impl List {
    /// Every distinct environment referenced by at least one application.
    pub fn environments(&self) -> BTreeMap<String, Environment> {
        let mut envs = BTreeMap::new();
        for app in &self.items {
            for (name, env) in &app.environments {
                envs.entry(name.clone())
                    .or_insert_with(|| env.environment.clone());
            }
        }
        envs
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
