mod cli;
mod command;
mod error;

use crate::cli::{Cli, Command};
use crate::error::{ErrorKind, Result};
use clap::Parser;
use exn::ResultExt;
use s3sync_config::Config;
use s3sync_engine::Context;
use s3sync_storage::BackendHandle;
use s3sync_storage::backend::{DryRunBackend, S3Backend};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted; stopping after the current file");
            on_interrupt.cancel();
        }
    });

    match run(cli, &cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = ?e, "Command failed");
            ExitCode::FAILURE
        },
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn run(cli: Cli, cancel: &CancellationToken) -> Result<()> {
    // Everything that can be checked without the network is checked first.
    let mut config = Config::load(cli.config.as_deref()).or_raise(|| ErrorKind::Config)?;
    cli.overrides.apply(&mut config);
    config.validate_credentials().or_raise(|| ErrorKind::Config)?;
    let ctx = Context::new(&config.namespace)
        .and_then(|ctx| ctx.with_prefix(&config.prefix))
        .or_raise(|| ErrorKind::Config)?;

    match cli.command {
        Command::Backup { dir } => {
            let root = command::directory(dir, config.backup_dir.as_ref(), "backup_dir")?;
            let backend = connect(&config, cli.dry_run);
            command::backup(&backend, &ctx, &root, cancel).await.map(|_| ())
        },
        Command::Restore { dir, keys } => {
            let destination = command::directory(dir, config.restore_dir.as_ref(), "restore_dir")?;
            let backend = connect(&config, cli.dry_run);
            command::restore(&backend, &ctx, &destination, &keys, cancel).await.map(|_| ())
        },
        Command::List => command::list(&connect(&config, cli.dry_run), &ctx).await,
        Command::Schedule { dir, every, unit } => {
            let root = command::directory(dir, config.backup_dir.as_ref(), "backup_dir")?;
            if let Some(every) = every {
                config.interval = every;
            }
            if let Some(unit) = unit {
                config.interval_unit = unit;
            }
            let period = config.schedule().or_raise(|| ErrorKind::Config)?;
            let backend = connect(&config, cli.dry_run);
            command::schedule(&backend, &ctx, &root, period, cancel).await
        },
    }
}

fn connect(config: &Config, dry_run: bool) -> BackendHandle {
    let s3 = S3Backend::new(
        "s3",
        &config.bucket,
        &config.region,
        config.endpoint.as_deref(),
        &config.access_key,
        &config.secret_key,
    );
    let backend: BackendHandle = Arc::new(s3);
    match dry_run {
        true => Arc::new(DryRunBackend::new(backend)),
        false => backend,
    }
}
