use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, builder::BoolishValueParser};

/// Command-line arguments for the markfresh binary.
#[derive(Debug, Parser)]
#[command(
    name = "markfresh",
    version,
    about = "Freshness-validated GitHub Markdown rendering cache"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "MARKFRESH_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service and the cache sweeper.
    Serve(Box<ServeArgs>),
    /// Render one document through the cache and print the outcome as JSON.
    Render(RenderArgs),
    /// Drop a cache entry by key or document URL.
    Invalidate(InvalidateArgs),
    /// Print store statistics as JSON.
    Stats(StoreArgs),
    /// Run a single sweep over keys whose expiry lapsed.
    Reap(StoreArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    #[command(flatten)]
    pub store: StoreOverrides,

    /// GitHub blob URL or repository URL of the document.
    #[arg(value_name = "URL")]
    pub url: String,
}

#[derive(Debug, Args, Clone)]
pub struct InvalidateArgs {
    #[command(flatten)]
    pub store: StoreOverrides,

    /// Cache key or GitHub document URL.
    #[arg(value_name = "KEY")]
    pub key: String,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreArgs {
    #[command(flatten)]
    pub store: StoreOverrides,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendArg {
    Redis,
    Memory,
}

#[derive(Debug, Args, Default, Clone)]
pub struct StoreOverrides {
    /// Override the cache backend.
    #[arg(long = "cache-backend", value_name = "BACKEND", value_enum)]
    pub cache_backend: Option<BackendArg>,

    /// Override the Redis connection URL.
    #[arg(long = "redis-url", value_name = "URL")]
    pub redis_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct UpstreamOverrides {
    /// Token used for GitHub API calls.
    #[arg(long = "github-token", env = "GITHUB_TOKEN", value_name = "TOKEN", hide_env_values = true)]
    pub github_token: Option<String>,

    /// Override the GitHub API base URL.
    #[arg(long = "github-api-base-url", value_name = "URL")]
    pub github_api_base_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub upstream: UpstreamOverrides,

    #[command(flatten)]
    pub store: StoreOverrides,

    /// Override the listener address (host:port).
    #[arg(long = "listen", value_name = "ADDR")]
    pub listen: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the cache entry lifetime.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,

    /// Override the per-request deadline.
    #[arg(long = "request-deadline-seconds", value_name = "SECONDS")]
    pub request_deadline_seconds: Option<u64>,

    /// Toggle coalescing of concurrent refreshes for the same key.
    #[arg(
        long = "coalesce",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub coalesce: Option<bool>,

    /// Toggle the scheduled cache sweeper.
    #[arg(
        long = "reaper-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub reaper_enabled: Option<bool>,

    /// Override the sweeper cron schedule.
    #[arg(long = "reaper-schedule", value_name = "CRON")]
    pub reaper_schedule: Option<String>,
}
