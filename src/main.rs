use std::{path::Path, process, sync::Arc};

use serde_json::Value;
use tagcache::{
    application::{error::AppError, render::DescriptionRenderer, repos::TagsRepo},
    cache::{LoadReport, ReloadScheduler, TagCache, TagCacheConfig},
    config,
    domain::types::TagCollection,
    infra::{db::PostgresRepositories, error::InfraError, memory::InMemoryTagsRepo, telemetry},
};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Run(config::RunArgs::default()));

    telemetry::init(&settings.logging)?;

    match command {
        config::Command::Run(args) => run_loop(settings, args).await,
        config::Command::Reload(args) => run_reload(settings, args).await,
    }
}

async fn run_loop(settings: config::Settings, args: config::RunArgs) -> Result<(), AppError> {
    let repo = init_repository(&settings, args.in_memory.as_deref()).await?;
    let cache = Arc::new(build_cache(&settings, repo)?);

    let reports = cache.reload_all().await;
    log_warmup(&reports);

    let handle = ReloadScheduler::new(Arc::clone(&cache), settings.scheduler.cadence).spawn();
    info!(
        cadence_secs = settings.scheduler.cadence.as_secs(),
        "Tag cache reload scheduler started"
    );

    tokio::signal::ctrl_c().await.map_err(InfraError::from)?;
    info!("Shutdown signal received; stopping tag cache");

    handle.abort();
    match handle.await {
        Err(err) if !err.is_cancelled() => {
            warn!(error = %err, "Tag cache scheduler ended abnormally");
        }
        _ => {}
    }

    Ok(())
}

async fn run_reload(settings: config::Settings, args: config::ReloadArgs) -> Result<(), AppError> {
    let repo = init_repository(&settings, args.in_memory.as_deref()).await?;
    let cache = build_cache(&settings, repo)?;

    let reports = if args.only.is_empty() {
        cache.reload_all().await
    } else {
        let mut reports = Vec::with_capacity(args.only.len());
        for collection in args.only {
            reports.push(cache.reload(TagCollection::from(collection)).await);
        }
        reports
    };

    let output = Value::Array(reports.iter().map(LoadReport::to_json).collect());
    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|err| AppError::unexpected(format!("failed to encode reports: {err}")))?;
    println!("{rendered}");

    Ok(())
}

fn build_cache(settings: &config::Settings, repo: Arc<dyn TagsRepo>) -> Result<TagCache, AppError> {
    let renderer = DescriptionRenderer::standard(settings.render.link_base.clone());
    let cache = TagCache::new(TagCacheConfig::from(&settings.tags), repo, renderer)?;
    Ok(cache)
}

async fn init_repository(
    settings: &config::Settings,
    seed: Option<&Path>,
) -> Result<Arc<dyn TagsRepo>, AppError> {
    if let Some(path) = seed {
        let repo = InMemoryTagsRepo::from_json_file(path).await?;
        info!(path = %path.display(), tags = repo.all().len(), "Loaded in-memory tag store");
        return Ok(Arc::new(repo));
    }

    let database_url = settings.database.url.as_ref().ok_or_else(|| {
        AppError::validation("database url is not configured; pass --database-url or --in-memory")
    })?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::migration(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

fn log_warmup(reports: &[LoadReport]) {
    for report in reports {
        if report.is_published() {
            continue;
        }
        warn!(
            collection = report.collection.as_str(),
            "Tag collection unavailable after warmup; serving empty collection until next reload"
        );
    }
}
