use std::sync::Once;

use metrics::{Unit, describe_counter, describe_histogram};
use tracing_error::ErrorLayer;
use tracing_subscriber::{
    EnvFilter, fmt,
    layer::{Layer, SubscriberExt},
    util::SubscriberInitExt,
};

use crate::config::{LogFormat, LoggingSettings};

use super::error::InfraError;

static METRIC_DESCRIPTIONS: Once = Once::new();

/// Install a global tracing subscriber using the provided logging settings.
pub fn init(logging: &LoggingSettings) -> Result<(), InfraError> {
    describe_metrics();

    let env_filter = EnvFilter::builder()
        .with_default_directive(logging.level.into())
        .from_env_lossy();

    let fmt_layer = match logging.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(true)
            .with_target(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(ErrorLayer::default())
        .with(fmt_layer)
        .try_init()
        .map_err(|err| {
            InfraError::telemetry(format!("failed to install tracing subscriber: {err}"))
        })
}

fn describe_metrics() {
    METRIC_DESCRIPTIONS.call_once(|| {
        describe_counter!(
            "markfresh_cache_hit_total",
            Unit::Count,
            "Requests served from a cache entry the probe confirmed current."
        );
        describe_counter!(
            "markfresh_cache_miss_total",
            Unit::Count,
            "Requests that found no usable cache entry."
        );
        describe_counter!(
            "markfresh_cache_stale_total",
            Unit::Count,
            "Cache entries found older than the upstream revision."
        );
        describe_counter!(
            "markfresh_cache_degraded_total",
            Unit::Count,
            "Cache entries served unverified because the probe failed."
        );
        describe_counter!(
            "markfresh_cache_fallback_total",
            Unit::Count,
            "Cache entries served because a refresh failed."
        );
        describe_counter!(
            "markfresh_cache_write_failed_total",
            Unit::Count,
            "Rendered documents that could not be written to the cache."
        );
        describe_counter!(
            "markfresh_reaper_deleted_total",
            Unit::Count,
            "Keys deleted by the reaper after their expiry lapsed."
        );
        describe_histogram!(
            "markfresh_render_duration_ms",
            Unit::Milliseconds,
            "Markdown to HTML render latency in milliseconds."
        );
    });
}
