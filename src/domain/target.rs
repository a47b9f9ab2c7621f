use super::port::{SchedulerClient, SchedulerError};

pub type SchedulerClientFactory = Box<
    dyn Fn(&str) -> Result<Box<dyn SchedulerClient + 'static + Sync + Send>, SchedulerError>
        + Sync
        + Send,
>;

/// Checks whether a target scheduler accepts our credentials.
pub struct TargetVerifier {
    client_factory: SchedulerClientFactory,
}

impl TargetVerifier {
    pub fn new(client_factory: SchedulerClientFactory) -> Self {
        Self { client_factory }
    }

    /// `Ok(false)` when the target rejects the credentials, `Err` for any
    /// other failure.
    pub async fn validate_authorization(&self, target: &str) -> Result<bool, SchedulerError> {
        let client = (self.client_factory)(target)?;
        match client.desired_lrps().await {
            Ok(_) => Ok(true),
            Err(SchedulerError::Unauthorized) => Ok(false),
            Err(e) => Err(e),
        }
    }
}
