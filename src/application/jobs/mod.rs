mod sweep_cache;

pub use sweep_cache::{
    SweepCacheContext, SweepCacheJob, process_sweep_cache_job, sweep_cache_schedule,
};
