//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, str::FromStr, time::Duration};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::jobs::sweep_cache_schedule;

mod cli;

pub use cli::*;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "markfresh";
const DEFAULT_LISTEN: &str = "127.0.0.1:3000";
const DEFAULT_GITHUB_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_GITHUB_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";
const DEFAULT_GITHUB_REQUEST_TIMEOUT_SECS: u64 = 10;
const DEFAULT_USER_AGENT: &str = "markfresh";
const DEFAULT_REDIS_URL: &str = "redis://127.0.0.1:6379";
const DEFAULT_CACHE_TTL_SECS: u64 = 12 * 60 * 60;
const DEFAULT_MAXMEMORY_POLICY: &str = "allkeys-lru";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_REQUEST_DEADLINE_SECS: u64 = 30;
pub(crate) const DEFAULT_REAPER_SCHEDULE: &str = "0 0 */6 * * *";
const DEFAULT_REAPER_SCAN_BATCH: usize = 100;

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub github: GitHubSettings,
    pub cache: CacheSettings,
    pub freshness: FreshnessSettings,
    pub reaper: ReaperSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub listen: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub api_base_url: String,
    pub raw_base_url: String,
    pub token: Option<String>,
    pub request_timeout: Duration,
    pub user_agent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Redis,
    Memory,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub redis_url: String,
    pub ttl: Duration,
    pub maxmemory_policy: Option<String>,
    pub connect_timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct FreshnessSettings {
    pub request_deadline: Duration,
    pub coalesce: bool,
}

#[derive(Debug, Clone)]
pub struct ReaperSettings {
    pub enabled: bool,
    pub schedule: String,
    pub scan_batch: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("MARKFRESH").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_command_overrides(cli.command.as_ref());

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    github: RawGitHubSettings,
    cache: RawCacheSettings,
    freshness: RawFreshnessSettings,
    reaper: RawReaperSettings,
}

impl RawSettings {
    fn apply_command_overrides(&mut self, command: Option<&Command>) {
        match command {
            Some(Command::Serve(args)) => self.apply_serve_overrides(&args.overrides),
            Some(Command::Render(args)) => {
                self.apply_upstream_overrides(&args.upstream);
                self.apply_store_overrides(&args.store);
            }
            Some(Command::Invalidate(args)) => self.apply_store_overrides(&args.store),
            Some(Command::Stats(args)) | Some(Command::Reap(args)) => {
                self.apply_store_overrides(&args.store)
            }
            None => self.apply_serve_overrides(&ServeOverrides::default()),
        }
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        self.apply_upstream_overrides(&overrides.upstream);
        self.apply_store_overrides(&overrides.store);

        if let Some(listen) = overrides.listen.as_ref() {
            self.server.listen = Some(listen.clone());
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
        if let Some(deadline) = overrides.request_deadline_seconds {
            self.freshness.request_deadline_seconds = Some(deadline);
        }
        if let Some(coalesce) = overrides.coalesce {
            self.freshness.coalesce = Some(coalesce);
        }
        if let Some(enabled) = overrides.reaper_enabled {
            self.reaper.enabled = Some(enabled);
        }
        if let Some(schedule) = overrides.reaper_schedule.as_ref() {
            self.reaper.schedule = Some(schedule.clone());
        }
    }

    fn apply_upstream_overrides(&mut self, overrides: &UpstreamOverrides) {
        if let Some(token) = overrides.github_token.as_ref() {
            self.github.token = Some(token.clone());
        }
        if let Some(url) = overrides.github_api_base_url.as_ref() {
            self.github.api_base_url = Some(url.clone());
        }
    }

    fn apply_store_overrides(&mut self, overrides: &StoreOverrides) {
        if let Some(backend) = overrides.cache_backend {
            self.cache.backend = Some(
                match backend {
                    BackendArg::Redis => "redis",
                    BackendArg::Memory => "memory",
                }
                .to_string(),
            );
        }
        if let Some(url) = overrides.redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            github,
            cache,
            freshness,
            reaper,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            github: build_github_settings(github)?,
            cache: build_cache_settings(cache)?,
            freshness: build_freshness_settings(freshness)?,
            reaper: build_reaper_settings(reaper)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let listen = server.listen.unwrap_or_else(|| DEFAULT_LISTEN.to_string());
    let listen = parse_socket_addr(listen.trim())
        .map_err(|reason| LoadError::invalid("server.listen", reason))?;
    if listen.port() == 0 {
        return Err(LoadError::invalid(
            "server.listen",
            "port must be greater than zero",
        ));
    }

    Ok(ServerSettings { listen })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = match (logging.json, logging.format.as_deref()) {
        (Some(true), _) => LogFormat::Json,
        (Some(false), _) | (None, None) | (None, Some("compact")) => LogFormat::Compact,
        (None, Some("json")) => LogFormat::Json,
        (None, Some(other)) => {
            return Err(LoadError::invalid(
                "logging.format",
                format!("expected `compact` or `json`, got `{other}`"),
            ));
        }
    };

    Ok(LoggingSettings { level, format })
}

fn build_github_settings(github: RawGitHubSettings) -> Result<GitHubSettings, LoadError> {
    let api_base_url = absolute_http_url(
        github.api_base_url.as_deref(),
        DEFAULT_GITHUB_API_BASE_URL,
        "github.api_base_url",
    )?;
    let raw_base_url = absolute_http_url(
        github.raw_base_url.as_deref(),
        DEFAULT_GITHUB_RAW_BASE_URL,
        "github.raw_base_url",
    )?;

    let token = github.token.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let request_timeout = positive_seconds(
        github
            .request_timeout_seconds
            .unwrap_or(DEFAULT_GITHUB_REQUEST_TIMEOUT_SECS),
        "github.request_timeout_seconds",
    )?;

    let user_agent = github
        .user_agent
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());

    Ok(GitHubSettings {
        api_base_url,
        raw_base_url,
        token,
        request_timeout,
        user_agent,
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match cache.backend.as_deref().map(str::trim) {
        None | Some("redis") => CacheBackend::Redis,
        Some("memory") => CacheBackend::Memory,
        Some(other) => {
            return Err(LoadError::invalid(
                "cache.backend",
                format!("expected `redis` or `memory`, got `{other}`"),
            ));
        }
    };

    let redis_url = cache
        .redis_url
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_REDIS_URL.to_string());

    let ttl = positive_seconds(
        cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS),
        "cache.ttl_seconds",
    )?;

    // An explicitly empty policy leaves the server's eviction setting alone.
    let maxmemory_policy = match cache.maxmemory_policy {
        Some(value) => {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        None => Some(DEFAULT_MAXMEMORY_POLICY.to_string()),
    };

    let connect_timeout = positive_seconds(
        cache
            .connect_timeout_seconds
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
        "cache.connect_timeout_seconds",
    )?;

    Ok(CacheSettings {
        backend,
        redis_url,
        ttl,
        maxmemory_policy,
        connect_timeout,
    })
}

fn build_freshness_settings(
    freshness: RawFreshnessSettings,
) -> Result<FreshnessSettings, LoadError> {
    let request_deadline = positive_seconds(
        freshness
            .request_deadline_seconds
            .unwrap_or(DEFAULT_REQUEST_DEADLINE_SECS),
        "freshness.request_deadline_seconds",
    )?;

    Ok(FreshnessSettings {
        request_deadline,
        coalesce: freshness.coalesce.unwrap_or(true),
    })
}

fn build_reaper_settings(reaper: RawReaperSettings) -> Result<ReaperSettings, LoadError> {
    let schedule = reaper
        .schedule
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_REAPER_SCHEDULE.to_string());
    sweep_cache_schedule(&schedule).map_err(|reason| LoadError::invalid("reaper.schedule", reason))?;

    let scan_batch = reaper.scan_batch.unwrap_or(DEFAULT_REAPER_SCAN_BATCH);
    if scan_batch == 0 {
        return Err(LoadError::invalid(
            "reaper.scan_batch",
            "must be greater than zero",
        ));
    }

    Ok(ReaperSettings {
        enabled: reaper.enabled.unwrap_or(true),
        schedule,
        scan_batch,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    listen: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    format: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawGitHubSettings {
    api_base_url: Option<String>,
    raw_base_url: Option<String>,
    token: Option<String>,
    request_timeout_seconds: Option<u64>,
    user_agent: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    redis_url: Option<String>,
    ttl_seconds: Option<u64>,
    maxmemory_policy: Option<String>,
    connect_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawFreshnessSettings {
    request_deadline_seconds: Option<u64>,
    coalesce: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawReaperSettings {
    enabled: Option<bool>,
    schedule: Option<String>,
    scan_batch: Option<usize>,
}

fn parse_socket_addr(candidate: &str) -> Result<SocketAddr, String> {
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn positive_seconds(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    Ok(Duration::from_secs(value))
}

fn absolute_http_url(
    value: Option<&str>,
    default: &str,
    key: &'static str,
) -> Result<String, LoadError> {
    let candidate = value.map(str::trim).unwrap_or(default);
    let parsed = Url::parse(candidate)
        .map_err(|err| LoadError::invalid(key, format!("invalid url `{candidate}`: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(LoadError::invalid(key, "scheme must be http or https"));
    }
    Ok(candidate.trim_end_matches('/').to_string())
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests;
