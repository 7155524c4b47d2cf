//! Cron job that sweeps cache keys whose expiry lapsed.

use std::str::FromStr;

use apalis::prelude::*;
use apalis_cron::Schedule;

use crate::cache::Reaper;

/// Marker struct for the cron-triggered sweep.
/// Must implement `From<chrono::DateTime<chrono::Utc>>` for apalis-cron compatibility.
#[derive(Default, Debug, Clone)]
pub struct SweepCacheJob;

impl From<chrono::DateTime<chrono::Utc>> for SweepCacheJob {
    fn from(_: chrono::DateTime<chrono::Utc>) -> Self {
        Self
    }
}

/// Context for the sweep worker.
#[derive(Clone)]
pub struct SweepCacheContext {
    pub reaper: Reaper,
}

/// Run one sweep. Failures are logged; the next tick tries again.
pub async fn process_sweep_cache_job(
    _job: SweepCacheJob,
    ctx: Data<SweepCacheContext>,
) -> Result<(), apalis::prelude::Error> {
    match ctx.reaper.sweep().await {
        Ok(report) if report.deleted > 0 || report.failed > 0 => {
            tracing::info!(
                deleted = report.deleted,
                failed = report.failed,
                "Swept lapsed cache keys"
            );
        }
        Err(err) => {
            tracing::warn!(error = %err, "Cache sweep failed");
        }
        _ => {}
    }
    Ok(())
}

/// Parse the sweep schedule (six-field cron, seconds first).
pub fn sweep_cache_schedule(expression: &str) -> Result<Schedule, String> {
    Schedule::from_str(expression).map_err(|err| format!("invalid cron expression: {err}"))
}
