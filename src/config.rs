use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::release_report::RELEASE_REPORT_PATH;

/// Environment variable naming a config file when `--config` is not given.
pub const CONFIG_ENV: &str = "JX_APPLICATION_CONFIG";

/// Namespace holding the catalog when neither config nor kubeconfig names one.
pub const DEFAULT_NAMESPACE: &str = "jx";

/// Settings for one aggregation run. Every field has a default so an absent
/// or partial YAML file is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// Dev namespace holding `Environment` and `SourceRepository` resources
    pub namespace: Option<String>,
    /// Kubeconfig context; the current context when unset
    pub context: Option<String>,
    /// Upper bound on environments fetched at the same time
    pub fetch_concurrency: usize,
    /// Release report location inside a cloned environment repository
    pub report_path: PathBuf,
    /// `git` executable; looked up on `PATH` when unset
    pub git_binary: Option<String>,
    /// Extra `git clone` arguments, shell quoted
    pub clone_args: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            namespace: None,
            context: None,
            fetch_concurrency: 4,
            report_path: PathBuf::from(RELEASE_REPORT_PATH),
            git_binary: None,
            clone_args: "--depth 1".to_string(),
        }
    }
}

impl Config {
    /// Loads `path`, or the file named by `JX_APPLICATION_CONFIG`, or the
    /// defaults when neither is set.
    ///
    /// The result is not validated, so command-line overrides can still fix
    /// it; call [`Config::validate`] once they are applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => Some(p.to_path_buf()),
            None => std::env::var_os(CONFIG_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        };

        let config = match path {
            Some(path) => {
                log::info!("config: loading {}", path.display());
                let raw = std::fs::read_to_string(&path).map_err(|e| {
                    Error::Config(format!("failed to read {}: {e}", path.display()))
                })?;
                Self::from_yaml(&raw)?
            }
            None => Self::default(),
        };
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|e| Error::Config(format!("failed to parse config: {e}")))
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_concurrency == 0 {
            return Err(Error::Config("fetchConcurrency must be at least 1".into()));
        }
        if self.report_path.is_absolute() {
            return Err(Error::Config(format!(
                "reportPath must be relative to the repository root, got {}",
                self.report_path.display()
            )));
        }
        self.clone_arg_list()?;
        Ok(())
    }

    pub fn clone_arg_list(&self) -> Result<Vec<String>> {
        shell_words::split(&self.clone_args)
            .map_err(|e| Error::Config(format!("cannot split cloneArgs {:?}: {e}", self.clone_args)))
    }

    /// Configured namespace, then the kube context's, then `jx`.
    pub fn resolve_namespace(&self, context_namespace: Option<&str>) -> String {
        self.namespace
            .as_deref()
            .or(context_namespace)
            .filter(|ns| !ns.is_empty())
            .unwrap_or(DEFAULT_NAMESPACE)
            .to_string()
    }
}
