// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Command implementations: the stream-driven service, a one-shot print, and
// the printer listing.

use anyhow::{Context, bail};
use tracing::warn;

use spoolgate_core::{DispatcherConfig, DocumentSource, JobOutcome, JobRequest, Orientation};
use spoolgate_dispatch::JobPipeline;
use spoolgate_print::{CupsSpooler, Spooler};

fn spooler(config: &DispatcherConfig) -> anyhow::Result<CupsSpooler> {
    CupsSpooler::new(&config.printer.cups_uri, config.pipeline.spooler_timeout())
        .context("failed to set up the CUPS client")
}

/// Consume the job stream until Ctrl-C / SIGTERM or the stream ends.
#[cfg(feature = "kafka")]
pub async fn run(config: &DispatcherConfig) -> anyhow::Result<()> {
    use spoolgate_dispatch::{IntakeLoop, KafkaJobStream};

    let bootstrap = config.validate_stream()?;
    let stream = KafkaJobStream::connect(&config.stream, bootstrap)
        .context("failed to connect to the message stream")?;
    let pipeline = JobPipeline::new(config, spooler(config)?)?;

    let stats = IntakeLoop::new(
        stream,
        pipeline,
        config.pipeline.job_delay(),
        config.stream.commit_policy,
    )
    .run(shutdown_signal())
    .await;

    tracing::info!(
        received = stats.received,
        done = stats.done,
        failed = stats.failed,
        "Spoolgate stopped"
    );
    Ok(())
}

#[cfg(not(feature = "kafka"))]
pub async fn run(config: &DispatcherConfig) -> anyhow::Result<()> {
    config.validate_stream()?;
    bail!("this build has no message stream support; rebuild with `--features kafka`")
}

/// Resolves on the first interrupt or termination signal.
#[cfg(feature = "kafka")]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Run a single job through the pipeline. A failed job is a non-zero exit.
pub async fn print_once(
    config: &DispatcherConfig,
    source: &str,
    quantity: u32,
    double_sided: bool,
    color: bool,
    orientation: Orientation,
) -> anyhow::Result<()> {
    let request = JobRequest::new(
        DocumentSource::parse(source)?,
        &config.printer.name,
        quantity,
        double_sided,
        color,
        orientation,
    )?;
    let pipeline = JobPipeline::new(config, spooler(config)?)?;

    let outcome = pipeline.process(request).await;
    let job_id = outcome.job_id();
    match outcome {
        JobOutcome::Done { spool_job_id, .. } => {
            println!("submitted as job {spool_job_id} on {}", config.printer.name);
            Ok(())
        }
        JobOutcome::Failed { stage, error, .. } => {
            bail!("job {job_id} failed at {stage} stage: {error}")
        }
    }
}

/// Print the spooler's printer registry, marking the configured printer.
pub async fn list_printers(config: &DispatcherConfig) -> anyhow::Result<()> {
    let printers = spooler(config)?
        .printers()
        .await
        .context("failed to query printers")?;

    if printers.is_empty() {
        warn!(cups = %config.printer.cups_uri, "spooler reports no printers");
    }
    for name in &printers {
        let marker = if *name == config.printer.name { '*' } else { ' ' };
        println!("{marker} {name}");
    }
    Ok(())
}
