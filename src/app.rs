use std::sync::Arc;

use anyhow::Result;

use crate::config::ConfigLoader;
use crate::core::models::classify;
use crate::core::scheduler::{RunContext, TaskCoordinator};
use crate::core::template::{Mode, PipelineTemplate};
use crate::engines::EngineRunner;
use crate::executors::toolchain;
use crate::ingest::epss::FirstEpssFeed;
use crate::ingest::pipeline::ReportIngestionPipeline;
use crate::organizers::layout;
use crate::remote::client::OpenVasClient;
use crate::remote::monitor::LifecycleMonitor;
use crate::sink::LogSink;
use crate::ui::printer;
use crate::utils::{logging, time};

pub async fn run(cli: crate::cli::args::Cli) -> Result<()> {
    let level = logging::level_from_cli(&cli);
    logging::init(level)?;

    // An invalid mode is a configuration error, caught before anything runs.
    let mode = Mode::from_int(cli.mode)?;
    let config = ConfigLoader::load_with_custom_path(cli.config.as_deref())?;

    tracing::info!(
        "Starting vulnhawk | mode: {} | target(s): {} | org: {}",
        mode.describe(),
        cli.target,
        cli.org
    );

    let targets = classify(&cli.target);
    if targets.is_empty() {
        tracing::warn!("No valid targets provided");
    }
    targets.log_summary();

    let run_id = time::new_run_id(&cli.org);
    tracing::info!("Run ID: {}", run_id);
    let dirs = layout::prepare_run_dirs(&run_id)?;
    layout::preflight_checks(&dirs)?;

    toolchain::verify_for_mode(mode, &config)?;

    match mode {
        Mode::Remote => {
            let api = OpenVasClient::new(&config.remote)?;
            let feed = Arc::new(FirstEpssFeed::new(&config.scoring)?);
            let pipeline = ReportIngestionPipeline::new(feed, Arc::new(LogSink), cli.org.clone());
            let monitor =
                LifecycleMonitor::new(api, pipeline, dirs.reports.clone(), &config.remote);

            let summary = monitor.scan_targets(&targets.all()).await?;
            printer::print_remote_summary(&cli.target, &run_id, &summary);
        }
        _ => {
            let template = PipelineTemplate::for_mode(mode, cli.bruteforce);
            template.validate()?;

            let ctx = Arc::new(RunContext {
                raw_targets: cli.target.clone(),
                targets,
                org_name: cli.org.clone(),
                dirs,
                config: config.clone(),
                bruteforce_timeout_secs: cli.bruteforce_timeout,
            });
            let coordinator =
                TaskCoordinator::new(Arc::new(EngineRunner), config.concurrency.max_concurrent_jobs);

            let aggregate = coordinator.execute(template, ctx).await;
            printer::print_summary(&cli.target, &run_id, &aggregate);
        }
    }

    Ok(())
}
