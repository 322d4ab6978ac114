//! The release report a remote cluster commits to its gitops repository.
use serde::{Deserialize, Serialize};

/// Path of the report relative to the repository root.
pub const RELEASE_REPORT_PATH: &str = "docs/releases.yaml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamespaceReleases {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub releases: Vec<ReleaseInfo>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseInfo {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default, alias = "applicationURL")]
    pub application_url: String,
}
