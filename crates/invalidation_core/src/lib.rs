//! Shared primitives for the CDN invalidation pipeline action.
//!
//! This crate owns the pipeline job contract, the invalidation request shape
//! and the export selection rules. It intentionally excludes AWS SDK and
//! Lambda runtime concerns; those live in `invalidation_lambda`.

pub mod contract;
pub mod export_lookup;
