// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use tracing_subscriber::prelude::*;

use kube_reflector::cli::{Args, Command};
use kube_reflector::config::Config;
use kube_reflector::kubernetes::discovery::KIND_REGISTRY;
use kube_reflector::kubernetes::{KubeStore, SelectorSpec, connect, default_namespace};
use kube_reflector::output::{MirrorListing, format_update};
use kube_reflector::progress::{SyncUpdate, create_spinner};
use kube_reflector::reflector::Reflector;

/// Initialize logging to stderr, plus rotated files when `log_dir` is given
fn init_logging(verbose: bool, log_dir: Option<&Path>) {
    use tracing_rolling_file::{RollingConditionBase, RollingFileAppenderBase};
    use tracing_subscriber::fmt::format::FmtSpan;

    let filter = if verbose {
        "kube_reflector=debug"
    } else {
        "kube_reflector=info"
    };
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter));

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_span_events(FmtSpan::NONE);

    let file_layer = log_dir.and_then(|dir| {
        if let Err(e) = std::fs::create_dir_all(dir) {
            eprintln!("Warning: Could not create log directory: {}", e);
            return None;
        }

        // Rotate daily or at 10MB, keep 5 files
        let condition = RollingConditionBase::new()
            .daily()
            .max_size(10 * 1024 * 1024);
        let appender =
            match RollingFileAppenderBase::new(dir.join("kube-reflector.log"), condition, 5) {
                Ok(appender) => appender,
                Err(e) => {
                    eprintln!("Warning: Could not create log file: {}", e);
                    return None;
                }
            };

        let (non_blocking, guard) = appender.get_non_blocking_appender();
        // Keep the background writer alive for the life of the process
        std::mem::forget(guard);

        Some(
            tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_span_events(FmtSpan::NONE),
        )
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stderr_layer)
        .with(file_layer)
        .init();
}

/// Merge the config file with command-line overrides
fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = Config::load(args.config.as_deref())?;

    if args.context.is_some() {
        config.context = args.context.clone();
    }
    if args.namespace.is_some() {
        config.namespace = args.namespace.clone();
    }
    if args.kind.is_some() {
        config.kind = args.kind.clone();
    }
    config.labels.extend(args.labels.iter().cloned());
    if let Some(preset) = args.preset {
        config.apply_preset(preset);
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider (aws-lc-rs)
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let args = Args::parse();
    init_logging(args.verbose, args.log_dir.as_deref());

    let config = resolve_config(&args)?;

    let kind_name = config
        .kind
        .as_deref()
        .context("No resource kind given; use --kind or --preset")?;
    let Some(kind) = KIND_REGISTRY.get(kind_name) else {
        bail!(
            "Unknown resource kind '{}'. Known kinds: {}",
            kind_name,
            KIND_REGISTRY.list().join(", ")
        );
    };

    let namespace = config.namespace.clone().unwrap_or_else(default_namespace);
    let selector = SelectorSpec::new(namespace, config.labels.clone())?;

    let spinner = create_spinner("Connecting to Kubernetes...");
    let client = match connect(config.context.as_deref()).await {
        Ok(client) => client,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e);
        }
    };

    let store = KubeStore::new(client, kind.api_resource.clone());
    let reflector = Reflector::new(Arc::new(store), selector, config.backoff);

    // Subscribe before the first list so no change applied after it is missed
    let updates = reflector.progress().subscribe();

    spinner.set_message(format!("Listing {} {}...", kind.plural, reflector.selector()));
    let started = reflector.start().await;
    spinner.finish_and_clear();
    started.with_context(|| format!("Initial list of {} failed", kind.plural))?;

    let mirror = reflector.mirror();
    println!(
        "{}",
        MirrorListing::from_snapshot(&mirror.snapshot()).format(args.output, args.no_headers)
    );

    match args.command.unwrap_or(Command::Watch) {
        Command::Snapshot => Ok(()),
        Command::Watch => watch(&reflector, updates).await,
    }
}

/// Print one line per applied change until the reflector gives up
///
/// `updates` must be subscribed before `start`; its first snapshot is the one
/// already printed as a table.
async fn watch(
    reflector: &Reflector,
    mut updates: broadcast::Receiver<SyncUpdate>,
) -> Result<()> {
    let mirror = reflector.mirror();
    let done = reflector.wait();
    tokio::pin!(done);

    info!(selector = %reflector.selector(), "Watching for changes");

    let mut initial_list = true;
    let error = loop {
        tokio::select! {
            biased;
            update = updates.recv() => match update {
                Ok(SyncUpdate::Snapshotted { .. }) if initial_list => initial_list = false,
                Ok(update) => {
                    if let Some(line) = format_update(&update, &mirror) {
                        println!("{}", line);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Output fell behind, some changes were not printed");
                }
                // Sender lives as long as the reflector
                Err(RecvError::Closed) => {}
            },
            error = &mut done => break error,
        }
    };

    Err(anyhow::Error::new(error).context("Reflector stopped"))
}
