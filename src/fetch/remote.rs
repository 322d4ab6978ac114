//! Deployment state of remote clusters, read from the release report they
//! commit to their gitops repository.
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use crate::error::{BoxError, Error, Result};
use crate::models::k8s::{Deployment, Environment};
use crate::models::release_report::{NamespaceReleases, ReleaseInfo};

/// Clones a git repository into an existing, empty directory.
#[async_trait]
pub trait RepositoryCloner: Send + Sync {
    async fn clone_to_dir(&self, git_url: &str, dir: &Path) -> std::result::Result<(), BoxError>;
}

/// Clones with the `git` command line.
#[derive(Debug, Clone)]
pub struct GitCli {
    binary: String,
    clone_args: Vec<String>,
}

impl GitCli {
    /// Uses `binary`, or `git` from `PATH` when `None`.
    pub fn new(binary: Option<&str>, clone_args: Vec<String>) -> Self {
        let binary = match binary {
            Some(b) => b.to_string(),
            None => which::which("git")
                .map(|p| p.to_string_lossy().to_string())
                .unwrap_or_else(|_| "git".to_string()),
        };
        Self { binary, clone_args }
    }
}

#[async_trait]
impl RepositoryCloner for GitCli {
    async fn clone_to_dir(&self, git_url: &str, dir: &Path) -> std::result::Result<(), BoxError> {
        log::debug!("remote: {} clone {git_url} {}", self.binary, dir.display());

        // Dropping the future (on cancellation) kills the clone
        let output = Command::new(&self.binary)
            .arg("clone")
            .args(&self.clone_args)
            // URLs come from cluster resources and must never parse as options
            .arg("--")
            .arg(git_url)
            .arg(dir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| format!("failed to run {}: {e}", self.binary))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git clone exited with {}: {}", output.status, stderr.trim()).into());
        }
        Ok(())
    }
}

/// Parses a release report. An empty document is an empty report.
pub fn parse_release_report(raw: &str) -> std::result::Result<Vec<NamespaceReleases>, serde_yaml::Error> {
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    serde_yaml::from_str(raw)
}

/// Releases of the first group for `namespace`; unnamed records are skipped.
pub fn deployments_for_namespace(report: &[NamespaceReleases], namespace: &str) -> Vec<Deployment> {
    report
        .iter()
        .find(|group| group.namespace == namespace)
        .map(|group| {
            group
                .releases
                .iter()
                .filter(|r| !r.name.is_empty())
                .map(release_to_deployment)
                .collect()
        })
        .unwrap_or_default()
}

fn release_to_deployment(release: &ReleaseInfo) -> Deployment {
    Deployment {
        name: release.name.clone(),
        version: release.version.clone(),
        url: release.application_url.clone(),
        ..Default::default()
    }
}

/// Clones the environment's repository into a private scratch directory and
/// reads the report at `report_path`. The directory is removed on every exit
/// path, including when the future is dropped.
pub async fn fetch_remote(
    cloner: &dyn RepositoryCloner,
    env: &Environment,
    report_path: &Path,
) -> Result<Vec<Deployment>> {
    let git_url = env.source_repo_url.as_str();
    if git_url.is_empty() {
        return Err(Error::MissingGitUrl {
            environment: env.name.clone(),
            namespace: env.namespace.clone(),
        });
    }
    let remote_err = |source: BoxError| Error::RemoteFetch {
        environment: env.name.clone(),
        namespace: env.namespace.clone(),
        git_url: git_url.to_string(),
        source,
    };

    let scratch = tempfile::Builder::new()
        .prefix("jx-application-")
        .tempdir()
        .map_err(|e| remote_err(Box::new(e)))?;
    cloner
        .clone_to_dir(git_url, scratch.path())
        .await
        .map_err(remote_err)?;

    let path = scratch.path().join(report_path);
    let exists = tokio::fs::try_exists(&path)
        .await
        .map_err(|e| remote_err(Box::new(e)))?;
    if !exists {
        log::info!(
            "remote: no {} in {git_url}, environment {} has no releases",
            report_path.display(),
            env.name
        );
        return Ok(Vec::new());
    }

    let raw = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| remote_err(Box::new(e)))?;
    let report = parse_release_report(&raw).map_err(|source| Error::ReportParse {
        environment: env.name.clone(),
        namespace: env.namespace.clone(),
        path: report_path.to_path_buf(),
        source,
    })?;

    let deployments = deployments_for_namespace(&report, &env.namespace);
    log::debug!(
        "remote: {} release(s) for {} in {git_url}",
        deployments.len(),
        env.namespace
    );
    Ok(deployments)
}
