use std::path::{Path, PathBuf};

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;

use crate::error::{Error, Result};

// ── helpers ───────────────────────────────────────────────────────────────────

/// Merges `extra` into `base`. `base.current_context` wins; `extra`'s is used
/// only when base has none.
fn merge_kubeconfig(mut base: Kubeconfig, extra: Kubeconfig) -> Kubeconfig {
    base.clusters.extend(extra.clusters);
    base.auth_infos.extend(extra.auth_infos);
    base.contexts.extend(extra.contexts);
    if base.current_context.is_none() {
        base.current_context = extra.current_context;
    }
    base
}

/// Regular, non-hidden files in `dir`, sorted so merge order is stable.
fn scan_kube_dir(dir: &Path) -> Vec<PathBuf> {
    let entries = match std::fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            log::debug!("kubeconfig: cannot read directory {}: {e}", dir.display());
            return Vec::new();
        }
    };

    let mut paths: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .filter(|path| {
            let name = path.file_name().and_then(|n| n.to_str()).unwrap_or("");
            !name.starts_with('.')
        })
        .collect();
    paths.sort();
    paths
}

/// Parses every path that is a kubeconfig and merges the results. Files that
/// fail to parse are skipped; `~/.kube` also holds caches and other tools' files.
fn load_from_paths(paths: &[PathBuf]) -> Option<Kubeconfig> {
    let mut merged: Option<Kubeconfig> = None;

    for path in paths {
        match Kubeconfig::read_from(path) {
            Ok(cfg) => {
                log::debug!(
                    "kubeconfig: ok ({} context(s)) {}",
                    cfg.contexts.len(),
                    path.display()
                );
                merged = Some(match merged.take() {
                    None => cfg,
                    Some(base) => merge_kubeconfig(base, cfg),
                });
            }
            Err(e) => {
                log::debug!("kubeconfig: skip (parse error: {e}) {}", path.display());
            }
        }
    }

    merged
}

/// Kubeconfig as kubectl would see it: `KUBECONFIG` when set, otherwise all
/// parseable files in `~/.kube`. `None` means fall back to in-cluster config.
fn discover_kubeconfig() -> Option<Kubeconfig> {
    let kube_env = std::env::var("KUBECONFIG").unwrap_or_default();
    if !kube_env.is_empty() {
        return match Kubeconfig::read() {
            Ok(cfg) => Some(cfg),
            Err(e) => {
                log::warn!("kubeconfig: cannot read KUBECONFIG={kube_env:?}: {e}");
                None
            }
        };
    }

    let kube_dir = dirs::home_dir()?.join(".kube");
    let candidates = scan_kube_dir(&kube_dir);
    log::debug!(
        "kubeconfig: {} candidate file(s) in {}",
        candidates.len(),
        kube_dir.display()
    );
    load_from_paths(&candidates)
}

/// Namespace configured on `context`, or on the current context when `None`.
fn context_namespace(kubeconfig: &Kubeconfig, context: Option<&str>) -> Option<String> {
    let name = context.or(kubeconfig.current_context.as_deref())?;
    kubeconfig
        .contexts
        .iter()
        .find(|named| named.name == name)
        .and_then(|named| named.context.as_ref())
        .and_then(|ctx| ctx.namespace.clone())
}

// ── client construction ───────────────────────────────────────────────────────

/// Builds a client for `context` and returns it with the context's namespace.
pub async fn build_client(context: Option<&str>) -> Result<(Client, Option<String>)> {
    let (config, namespace) = match discover_kubeconfig() {
        Some(kubeconfig) => {
            let namespace = context_namespace(&kubeconfig, context);
            let options = KubeConfigOptions {
                context: context.map(str::to_string),
                ..Default::default()
            };
            let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
                .await
                .map_err(|e| Error::KubeConfig(Box::new(e)))?;
            (config, namespace)
        }
        None => {
            if let Some(context) = context {
                return Err(Error::Config(format!(
                    "context {context} requested but no kubeconfig was found"
                )));
            }
            log::info!("kubeconfig: none found, using in-cluster configuration");
            let config = kube::Config::incluster().map_err(|e| Error::KubeConfig(Box::new(e)))?;
            let namespace = Some(config.default_namespace.clone());
            (config, namespace)
        }
    };

    log::info!("kubeconfig: connecting to {}", config.cluster_url);
    let client = Client::try_from(config).map_err(|e| Error::KubeConfig(Box::new(e)))?;
    Ok((client, namespace))
}
