use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Serialize;

use jx_application::{CancellationToken, Config, List};

/// Shows which environments each registered application is deployed to.
#[derive(Debug, Parser)]
#[command(name = "jx-application", version)]
struct Cli {
    /// YAML config file (defaults to $JX_APPLICATION_CONFIG)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Dev namespace holding the environment and repository catalogs
    #[arg(short, long)]
    namespace: Option<String>,
    /// Kubeconfig context to use
    #[arg(long)]
    context: Option<String>,
    /// Maximum number of environments fetched at once
    #[arg(long)]
    concurrency: Option<usize>,
    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,
    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Snapshot<'a> {
    generated_at: DateTime<Utc>,
    namespace: &'a str,
    #[serde(flatten)]
    list: &'a List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> jx_application::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.namespace.is_some() {
        config.namespace = cli.namespace;
    }
    if cli.context.is_some() {
        config.context = cli.context;
    }
    if let Some(concurrency) = cli.concurrency {
        config.fetch_concurrency = concurrency;
    }
    config.validate()?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let (namespace, list) = jx_application::run(&config, &cancel).await?;
    if list.is_empty() {
        log::info!("No applications found");
    }

    let snapshot = Snapshot {
        generated_at: Utc::now(),
        namespace: &namespace,
        list: &list,
    };
    let json = if cli.pretty {
        serde_json::to_string_pretty(&snapshot)
    } else {
        serde_json::to_string(&snapshot)
    }?;
    println!("{json}");
    Ok(())
}
