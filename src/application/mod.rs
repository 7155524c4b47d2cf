//! Application services: the freshness orchestrator and what it coordinates.

pub mod error;
pub mod freshness;
pub mod jobs;
pub mod render;
pub mod upstream;
