use crate::application::freshness::FreshnessCache;

#[derive(Clone)]
pub struct ApiState {
    pub cache: FreshnessCache,
}

impl ApiState {
    pub fn new(cache: FreshnessCache) -> Self {
        Self { cache }
    }
}
