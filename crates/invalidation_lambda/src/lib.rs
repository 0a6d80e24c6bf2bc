//! AWS-oriented adapters and handlers for the CDN invalidation pipeline action.
//!
//! This crate owns runtime integration details (the Lambda handler and the
//! CloudFormation, CloudFront and CodePipeline seams). Contracts and export
//! selection live in `invalidation_core`.

pub mod adapters;
pub mod handlers;
