use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use remoteconfig::cli::Cli;
use remoteconfig::config;
use remoteconfig::context::OperationContext;
use remoteconfig::credentials::ServiceAccountKey;
use remoteconfig::updater::{ConfigUpdater, SessionOptions};
use std::process::ExitCode;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    // Diagnostics only; stdout stays empty.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {e:#}", style("error:").red().bold());
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = config::load(cli.config.as_deref())?;

    let encoded =
        cli.resolve_credentials(&config.credentials_env_var, |name| std::env::var(name).ok())?;
    let key = ServiceAccountKey::from_base64(&encoded)?;
    let updates = cli.update_request(std::io::stdin().lock())?;

    let timeout = Duration::from_secs(cli.timeout.unwrap_or(config.timeout_seconds));
    let ctx = OperationContext::with_timeout(timeout)?;

    let cancel = ctx.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, aborting update");
            cancel.cancel();
        }
    });

    let options = SessionOptions {
        endpoint: cli.endpoint.clone().unwrap_or(config.endpoint),
        token_uri: config.token_uri,
    };
    let updater = ConfigUpdater::connect(&ctx, &cli.project, &key, &options)
        .await
        .context("connect to Remote Config")?
        .validate_only(cli.validate_only);

    updater
        .set_default_values(&ctx, &updates)
        .await
        .context("SetDefaultValues")?;

    Ok(())
}
