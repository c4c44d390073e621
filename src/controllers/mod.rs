//! Coordination glue between the core services and screens.
//!
//! Controllers perform mutations and publish the matching invalidation
//! events; views own their subscriptions and refresh on the next render.

pub mod closet;
pub mod home;
pub mod outfits;
pub mod profile;
pub mod views;

use crate::services::api::ApiError;
use crate::services::cache::CacheError;
use crate::services::poller::JobError;
use crate::services::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error("Invalid input: {0}")]
    Invalid(String),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Job(#[from] JobError),

    #[error("Local storage failed: {0}")]
    Store(#[from] StoreError),
}

impl From<garde::Report> for FlowError {
    fn from(report: garde::Report) -> Self {
        FlowError::Invalid(report.to_string())
    }
}
