use async_trait::async_trait;
use thiserror::Error;

use super::model::{ActualLrp, DesiredLrp, DesiredLrpUpdateRequest};

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("not authorized against the scheduler")]
    Unauthorized,

    #[error("{kind}: {message}")]
    Api { kind: String, message: String },

    #[error("invalid scheduler target: {0}")]
    InvalidTarget(String),

    #[error("invalid response from the scheduler: {0}")]
    InvalidResponse(String),

    #[error("can't reach the scheduler: {0:#}")]
    Transport(anyhow::Error),
}

/// Remote desired/actual state store the app runner drives.
#[async_trait]
pub trait SchedulerClient: Send + Sync {
    async fn desired_lrps(&self) -> Result<Vec<DesiredLrp>, SchedulerError>;

    async fn create_desired_lrp(&self, desired_lrp: &DesiredLrp) -> Result<(), SchedulerError>;

    async fn update_desired_lrp(
        &self,
        process_guid: &str,
        update: &DesiredLrpUpdateRequest,
    ) -> Result<(), SchedulerError>;

    async fn delete_desired_lrp(&self, process_guid: &str) -> Result<(), SchedulerError>;

    async fn actual_lrps(&self) -> Result<Vec<ActualLrp>, SchedulerError>;

    async fn actual_lrps_by_process_guid(
        &self,
        process_guid: &str,
    ) -> Result<Vec<ActualLrp>, SchedulerError>;
}
