pub mod export_registry;
pub mod invalidation;
pub mod job_result;
