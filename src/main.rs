use std::{process, sync::Arc};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::CronStream;
use markfresh::{
    application::{
        error::AppError,
        freshness::{FreshnessCache, FreshnessPolicy},
        jobs::{SweepCacheContext, process_sweep_cache_job, sweep_cache_schedule},
        render::render_service,
    },
    cache::{CacheConfig, CacheStore, MemoryStore, Reaper, RedisStore},
    config::{self, CacheBackend},
    infra::{
        error::InfraError,
        github::{GitHubClient, GitHubClientConfig},
        http::{self, ApiState},
        telemetry,
    },
};
use serde::Serialize;
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
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
        config::Command::Invalidate(args) => run_invalidate(settings, args).await,
        config::Command::Stats(_) => run_stats(settings).await,
        config::Command::Reap(_) => run_reap(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    warn_if_tokenless(&settings.github);
    let store = connect_store(&settings.cache).await?;
    let cache = build_freshness_cache(&settings, Arc::clone(&store))?;

    let monitor_handle = settings
        .reaper
        .enabled
        .then(|| spawn_sweep_monitor(store, &settings.reaper))
        .transpose()?;

    let result = serve_http(&settings, ApiState::new(cache)).await;

    if let Some(handle) = monitor_handle {
        handle.abort();
        let _ = handle.await;
    }

    result
}

async fn run_render(settings: config::Settings, args: config::RenderArgs) -> Result<(), AppError> {
    warn_if_tokenless(&settings.github);
    let store = connect_store(&settings.cache).await?;
    let cache = build_freshness_cache(&settings, store)?;

    let outcome = cache.render_or_fetch_url(&args.url).await?;
    info!(
        url = %args.url,
        source = outcome.source.label(),
        "Rendered document"
    );
    print_json(&outcome)
}

async fn run_invalidate(
    settings: config::Settings,
    args: config::InvalidateArgs,
) -> Result<(), AppError> {
    let store = connect_store(&settings.cache).await?;
    let cache = build_freshness_cache(&settings, store)?;

    let key = cache.invalidate(&args.key).await?;
    println!("{key}");
    Ok(())
}

async fn run_stats(settings: config::Settings) -> Result<(), AppError> {
    let store = connect_store(&settings.cache).await?;
    let stats = store.stats().await?;
    print_json(&stats)
}

async fn run_reap(settings: config::Settings) -> Result<(), AppError> {
    let store = connect_store(&settings.cache).await?;
    let report = Reaper::new(store, settings.reaper.scan_batch).sweep().await?;
    print_json(&report)
}

async fn connect_store(cache: &config::CacheSettings) -> Result<Arc<dyn CacheStore>, AppError> {
    match cache.backend {
        CacheBackend::Redis => {
            let store = RedisStore::connect(&CacheConfig::from(cache)).await?;
            Ok(Arc::new(store))
        }
        CacheBackend::Memory => {
            info!("Using in-process memory cache");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn build_freshness_cache(
    settings: &config::Settings,
    store: Arc<dyn CacheStore>,
) -> Result<FreshnessCache, AppError> {
    let github = Arc::new(GitHubClient::new(&GitHubClientConfig::from(
        &settings.github,
    ))?);

    let policy = FreshnessPolicy {
        ttl: settings.cache.ttl,
        request_deadline: settings.freshness.request_deadline,
        coalesce: settings.freshness.coalesce,
        raw_base_url: settings.github.raw_base_url.clone(),
    };

    Ok(FreshnessCache::new(
        store,
        github.clone(),
        github,
        render_service(),
        policy,
    ))
}

fn warn_if_tokenless(github: &config::GitHubSettings) {
    if github.token.is_none() {
        warn!("No GitHub token configured; upstream calls will be rejected");
    }
}

fn spawn_sweep_monitor(
    store: Arc<dyn CacheStore>,
    reaper: &config::ReaperSettings,
) -> Result<tokio::task::JoinHandle<()>, AppError> {
    let schedule = sweep_cache_schedule(&reaper.schedule).map_err(AppError::validation)?;
    let context = SweepCacheContext {
        reaper: Reaper::new(store, reaper.scan_batch),
    };

    let sweep_worker = WorkerBuilder::new("markfresh-sweep-cache")
        .data(context)
        .backend(CronStream::new(schedule))
        .build_fn(process_sweep_cache_job);

    let monitor = Monitor::new().register(sweep_worker);
    info!(schedule = %reaper.schedule, "Scheduled cache sweeper");

    Ok(tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    }))
}

async fn serve_http(settings: &config::Settings, state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.listen)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.listen, "Listening");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), AppError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|err| AppError::unexpected(format!("failed to encode output: {err}")))?;
    println!("{rendered}");
    Ok(())
}
