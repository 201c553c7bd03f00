use std::io::{self, IsTerminal};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid2asset_core::bundle::{BundleError, BundleOrchestrator, BundleOutput};
use uuid2asset_core::download::{AssetFetcher, EngineError, HttpClient, RetrievalEngine};
use uuid2asset_core::manifest::Manifest;

use crate::ProcessExit;
use crate::app::{config, exit_handler, progress, terminal};
use crate::cli::Args;

pub(crate) async fn run_uuid2asset(args: Args) -> Result<ProcessExit> {
    let no_color = terminal::no_color_env_requested() || terminal::is_dumb_terminal();
    terminal::init_tracing(config::resolve_default_log_level(&args), no_color);

    debug!(?args, "CLI arguments parsed");
    let settings = config::resolve_config(&args)?;
    info!(
        server = %args.server_url,
        manifests = args.manifests.len(),
        concurrency = settings.engine.concurrency,
        extensions = settings.extensions.len(),
        "uuid2asset starting"
    );

    let cancel = CancellationToken::new();
    let interrupted = Arc::new(AtomicBool::new(false));
    spawn_interrupt_listener(cancel.clone(), Arc::clone(&interrupted));

    let engine = RetrievalEngine::new(settings.engine.clone())?.with_cancellation(cancel.clone());
    let fetcher: Arc<dyn AssetFetcher> = Arc::new(HttpClient::new()?);
    let use_bar = terminal::should_use_progress_bar(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    );
    let orchestrator =
        BundleOrchestrator::new(engine, fetcher, &args.server_url, settings.extensions.clone())?
            .with_observer(progress::make_observer(use_bar, "fetching"));

    let mut succeeded = 0usize;
    let mut failed = 0usize;

    for manifest_path in &args.manifests {
        if cancel.is_cancelled() {
            break;
        }
        match process_manifest(&orchestrator, manifest_path, &settings.output_dir).await {
            Ok(output) => {
                print_bundle_summary(&output, args.quiet);
                if output.report.degraded {
                    warn!(
                        bundle = %output.report.name,
                        "bundle written with skipped bases; see warnings above"
                    );
                    failed += 1;
                } else {
                    succeeded += 1;
                }
            }
            Err(BundleError::Engine(EngineError::Cancelled { processed, total })) => {
                warn!(
                    manifest = %manifest_path.display(),
                    processed, total, "Interrupted. No archive was written for this bundle."
                );
                break;
            }
            Err(e) => {
                error!(manifest = %manifest_path.display(), error = %e, "bundle failed");
                failed += 1;
            }
        }
    }

    info!(succeeded, failed, "uuid2asset finished");
    Ok(exit_handler::determine_exit_outcome(
        succeeded,
        failed,
        interrupted.load(Ordering::SeqCst),
    ))
}

async fn process_manifest(
    orchestrator: &BundleOrchestrator,
    manifest_path: &Path,
    output_dir: &Path,
) -> Result<BundleOutput, BundleError> {
    let manifest = Manifest::load(manifest_path).await?;
    orchestrator.process(&manifest, output_dir).await
}

fn spawn_interrupt_listener(cancel: CancellationToken, interrupted: Arc<AtomicBool>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupted.store(true, Ordering::SeqCst);
            warn!("Interrupt received, cancelling in-flight requests");
            cancel.cancel();
        }
    });
}

fn print_bundle_summary(output: &BundleOutput, quiet: bool) {
    if quiet {
        return;
    }
    let report = &output.report;
    println!(
        "{}: {} files ({} bytes) -> {}",
        report.name,
        report.files,
        report.bytes,
        output.archive_path.display()
    );
    for base in &report.bases {
        match &base.skipped {
            Some(reason) => println!("  {}: skipped ({reason})", base.base_type),
            None => println!(
                "  {}: {} found, {} missing, {} retries",
                base.base_type, base.found, base.not_found, base.retried
            ),
        }
    }
}
