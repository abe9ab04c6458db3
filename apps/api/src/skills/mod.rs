// Skill store reads, snapshot aggregation, and the dashboard rollup.

pub mod handlers;
pub mod insights;
pub mod snapshot;
