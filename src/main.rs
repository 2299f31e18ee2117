use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use vaga::applicant::ApplicantProfile;
use vaga::browser::{BrowserDriver, HttpBrowserDriver};
use vaga::cli::{Cli, Command};
use vaga::config::VagaConfig;
use vaga::demo::demo_orchestrator;
use vaga::gateway::{
    ContentGateway, KeywordScorer, RemoteContentGateway, RemoteScoringGateway, ScoringGateway,
    TemplateContentGateway,
};
use vaga::orchestrator::{ResumeAction, RunOrchestrator, RunSettings};
use vaga::sources::{
    BoardwireSource, FormhireSource, JobSourceAdapter, JobfeedSource, SearchQuery, SourceRegistry,
};
use vaga::store::{JsonFileStore, Repository};
use vaga::strategy::{
    ApplyStrategy, AssistedStrategy, EasyApplyStrategy, StructuredApiStrategy,
};
use vaga::ui::RunProgress;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_telemetry(cli.verbose)?;

    let mut config = VagaConfig::load()?;
    if let Some(max_retries) = cli.max_retries {
        config.max_retries = max_retries;
    }

    match cli.command {
        Command::Run {
            query,
            location,
            threshold,
            workers,
            auto_approve,
        } => {
            if let Some(threshold) = threshold {
                config.relevance_threshold = threshold;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }
            if auto_approve {
                config.auto_approve = true;
            }

            let store = Arc::new(JsonFileStore::new(&config.data_dir)?);
            let orchestrator = build_orchestrator(&config, store.clone())?;

            // Ctrl-C stops dispatching new jobs; in-flight attempts finish.
            let cancel = orchestrator.cancel_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    eprintln!("cancellation requested, finishing in-flight attempts...");
                    cancel.store(true, Ordering::SeqCst);
                }
            });

            let mut search = SearchQuery::new(&query);
            search.location = location;

            let progress = RunProgress::start(&query);
            let run = orchestrator.execute(search).await?;
            progress.finish(&run);
            for job in store.jobs_for_run(&run.id).await? {
                progress.job_line(&job);
            }
        }

        Command::Status { run_id } => {
            let store = JsonFileStore::new(&config.data_dir)?;
            let run = match run_id {
                Some(id) => store
                    .load_run(&id)
                    .await?
                    .with_context(|| format!("run not found: {id}"))?,
                None => store
                    .latest_run()
                    .await?
                    .context("no runs recorded yet; start one with `vaga run`")?,
            };
            let progress = RunProgress::attach();
            progress.finish(&run);
            for job in store.jobs_for_run(&run.id).await? {
                progress.job_line(&job);
            }
            progress.print_run(&run);
        }

        Command::Resume {
            job_id,
            mark_applied,
            abandon,
        } => {
            let store = Arc::new(JsonFileStore::new(&config.data_dir)?);
            let orchestrator = build_orchestrator(&config, store)?;
            let action = if mark_applied {
                ResumeAction::MarkApplied
            } else if abandon {
                ResumeAction::Abandon
            } else {
                ResumeAction::Retry
            };
            let (job, verdict) = orchestrator.resume_job(&job_id, action).await?;
            match verdict {
                Some(verdict) => println!("job {} → {:?}", job.id, verdict),
                None => println!("job {} → {}", job.id, job.status),
            }
        }

        Command::Demo => {
            let (orchestrator, store) = demo_orchestrator();
            let query = "rust";
            let progress = RunProgress::start(query);
            let run = orchestrator.execute(SearchQuery::new(query)).await?;
            progress.finish(&run);
            for job in store.jobs_for_run(&run.id).await? {
                progress.job_line(&job);
            }
        }
    }

    Ok(())
}

fn init_telemetry(verbose: bool) -> Result<()> {
    let default_filter = if verbose { "vaga=debug" } else { "vaga=info" };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|e| anyhow::anyhow!("telemetry error: {e}"))?;
    Ok(())
}

/// Wire the orchestrator from configuration: configured sources, remote
/// gateways when URLs are set (local backends otherwise), browser bridge,
/// and the full strategy chain.
fn build_orchestrator(
    config: &VagaConfig,
    store: Arc<dyn Repository>,
) -> Result<RunOrchestrator> {
    let profile = ApplicantProfile::load(Path::new(&config.profile_path)).with_context(|| {
        format!(
            "failed to load applicant profile from {}",
            config.profile_path
        )
    })?;

    let mut adapters: Vec<Arc<dyn JobSourceAdapter>> = Vec::new();
    if !config.sources.boardwire_url.is_empty() {
        adapters.push(Arc::new(BoardwireSource::new(
            config.sources.boardwire_url.clone(),
            config.sources.boardwire_api_key.clone(),
        )));
    }
    if !config.sources.formhire_url.is_empty() {
        adapters.push(Arc::new(FormhireSource::new(
            config.sources.formhire_url.clone(),
        )));
    }
    if !config.sources.jobfeed_url.is_empty() {
        adapters.push(Arc::new(JobfeedSource::new(
            config.sources.jobfeed_url.clone(),
        )));
    }
    if adapters.is_empty() {
        bail!("no job sources configured; set [sources] URLs in vaga.toml (or try `vaga demo`)");
    }
    let sources = Arc::new(SourceRegistry::new(adapters));

    let scoring: Arc<dyn ScoringGateway> = if config.scoring_url.is_empty() {
        Arc::new(KeywordScorer::new(profile.clone()))
    } else {
        Arc::new(RemoteScoringGateway::new(config.scoring_url.clone()))
    };
    let content: Arc<dyn ContentGateway> = if config.content_url.is_empty() {
        Arc::new(TemplateContentGateway::new(profile.clone()))
    } else {
        Arc::new(RemoteContentGateway::new(config.content_url.clone()))
    };

    let browser: Arc<dyn BrowserDriver> =
        Arc::new(HttpBrowserDriver::new(config.browser_url.clone()));
    let strategies: Vec<Arc<dyn ApplyStrategy>> = vec![
        Arc::new(StructuredApiStrategy::new(sources.clone())),
        Arc::new(EasyApplyStrategy::new(browser.clone(), sources.clone())),
        Arc::new(AssistedStrategy::new(browser)),
    ];

    Ok(RunOrchestrator::new(
        sources,
        scoring,
        content,
        strategies,
        store,
        profile,
        RunSettings {
            relevance_threshold: config.relevance_threshold,
            retry_policy: config.retry_policy(),
            workers: config.workers,
            auto_approve: config.auto_approve,
        },
    ))
}
