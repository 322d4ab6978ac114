use std::path::PathBuf;

use thiserror::Error;

/// Boxed error returned by cluster and git collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T> = std::result::Result<T, Error>;

/// Every failure an aggregation run can end with.
///
/// Per-environment variants carry the environment name and namespace so the
/// caller can report which fetch broke without losing the kind of failure.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read the {what} catalog in namespace {namespace}: {source}")]
    CatalogRead {
        what: &'static str,
        namespace: String,
        #[source]
        source: BoxError,
    },

    #[error(
        "cannot resolve the pod selector of deployment {deployment} \
         in environment {environment} (namespace {namespace}): {reason}"
    )]
    SelectorResolution {
        environment: String,
        namespace: String,
        deployment: String,
        reason: String,
    },

    #[error("no git URL on remote environment {environment} (namespace {namespace})")]
    MissingGitUrl {
        environment: String,
        namespace: String,
    },

    #[error(
        "failed to fetch the release report from {git_url} \
         for environment {environment} (namespace {namespace}): {source}"
    )]
    RemoteFetch {
        environment: String,
        namespace: String,
        git_url: String,
        #[source]
        source: BoxError,
    },

    #[error(
        "malformed release report {} for environment {environment} (namespace {namespace}): {source}",
        path.display()
    )]
    ReportParse {
        environment: String,
        namespace: String,
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to list deployments for environment {environment} (namespace {namespace}): {source}")]
    DeploymentList {
        environment: String,
        namespace: String,
        #[source]
        source: BoxError,
    },

    #[error("aggregation cancelled")]
    Cancelled,

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("failed to build a Kubernetes client: {0}")]
    KubeConfig(#[source] BoxError),

    #[error("failed to encode output: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// Namespace of the environment the error is attached to, if any.
    pub fn namespace(&self) -> Option<&str> {
        match self {
            Error::CatalogRead { namespace, .. }
            | Error::SelectorResolution { namespace, .. }
            | Error::MissingGitUrl { namespace, .. }
            | Error::RemoteFetch { namespace, .. }
            | Error::ReportParse { namespace, .. }
            | Error::DeploymentList { namespace, .. } => Some(namespace),
            Error::Cancelled | Error::Config(_) | Error::KubeConfig(_) | Error::Encode(_) => None,
        }
    }
}
