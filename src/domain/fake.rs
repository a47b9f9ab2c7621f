use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{
    model::{ActualLrp, ActualLrpState, DesiredLrp, DesiredLrpUpdateRequest},
    port::{SchedulerClient, SchedulerError},
};

#[derive(Clone, Debug, PartialEq)]
pub enum Call {
    Create(DesiredLrp),
    Update(String, DesiredLrpUpdateRequest),
    Delete(String),
}

/// In-memory scheduler. Records every mutating call and applies it to its
/// own desired list so listings reflect what was issued.
#[derive(Default)]
pub struct FakeSchedulerClient {
    pub desired: Mutex<Vec<DesiredLrp>>,
    pub actual: Mutex<Vec<ActualLrp>>,
    pub calls: Mutex<Vec<Call>>,
    query_error: Mutex<Option<SchedulerError>>,
}

impl FakeSchedulerClient {
    pub fn with_desired(names: &[&str]) -> Self {
        let fake = Self::default();
        fake.desired.lock().unwrap().extend(names.iter().map(|name| DesiredLrp {
            process_guid: name.to_string(),
            ..Default::default()
        }));
        fake
    }

    pub fn add_actual(&self, name: &str, state: ActualLrpState) {
        let mut actual = self.actual.lock().unwrap();
        let index = actual.iter().filter(|lrp| lrp.process_guid == name).count() as u32;
        actual.push(ActualLrp {
            process_guid: name.to_string(),
            instance_guid: format!("{}-{}", name, index),
            cell_id: "cell-0".to_string(),
            domain: "lattice".to_string(),
            index,
            address: "10.0.0.1".to_string(),
            state,
        });
    }

    /// Next query returns `error` instead of a listing.
    pub fn fail_next_query(&self, error: SchedulerError) {
        *self.query_error.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn desired_named(&self, name: &str) -> Vec<DesiredLrp> {
        self.desired
            .lock()
            .unwrap()
            .iter()
            .filter(|lrp| lrp.process_guid == name)
            .cloned()
            .collect()
    }

    fn check_query(&self) -> Result<(), SchedulerError> {
        match self.query_error.lock().unwrap().take() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SchedulerClient for FakeSchedulerClient {
    async fn desired_lrps(&self) -> Result<Vec<DesiredLrp>, SchedulerError> {
        self.check_query()?;
        Ok(self.desired.lock().unwrap().clone())
    }

    async fn create_desired_lrp(&self, desired_lrp: &DesiredLrp) -> Result<(), SchedulerError> {
        self.calls.lock().unwrap().push(Call::Create(desired_lrp.clone()));
        self.desired.lock().unwrap().push(desired_lrp.clone());
        Ok(())
    }

    async fn update_desired_lrp(
        &self,
        process_guid: &str,
        update: &DesiredLrpUpdateRequest,
    ) -> Result<(), SchedulerError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Update(process_guid.to_string(), update.clone()));
        if let Some(instances) = update.instances {
            self.desired
                .lock()
                .unwrap()
                .iter_mut()
                .filter(|lrp| lrp.process_guid == process_guid)
                .for_each(|lrp| lrp.instances = instances);
        }
        Ok(())
    }

    async fn delete_desired_lrp(&self, process_guid: &str) -> Result<(), SchedulerError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::Delete(process_guid.to_string()));
        self.desired
            .lock()
            .unwrap()
            .retain(|lrp| lrp.process_guid != process_guid);
        Ok(())
    }

    async fn actual_lrps(&self) -> Result<Vec<ActualLrp>, SchedulerError> {
        self.check_query()?;
        Ok(self.actual.lock().unwrap().clone())
    }

    async fn actual_lrps_by_process_guid(
        &self,
        process_guid: &str,
    ) -> Result<Vec<ActualLrp>, SchedulerError> {
        self.check_query()?;
        Ok(self
            .actual
            .lock()
            .unwrap()
            .iter()
            .filter(|lrp| lrp.process_guid == process_guid)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl SchedulerClient for Arc<FakeSchedulerClient> {
    async fn desired_lrps(&self) -> Result<Vec<DesiredLrp>, SchedulerError> {
        self.as_ref().desired_lrps().await
    }

    async fn create_desired_lrp(&self, desired_lrp: &DesiredLrp) -> Result<(), SchedulerError> {
        self.as_ref().create_desired_lrp(desired_lrp).await
    }

    async fn update_desired_lrp(
        &self,
        process_guid: &str,
        update: &DesiredLrpUpdateRequest,
    ) -> Result<(), SchedulerError> {
        self.as_ref().update_desired_lrp(process_guid, update).await
    }

    async fn delete_desired_lrp(&self, process_guid: &str) -> Result<(), SchedulerError> {
        self.as_ref().delete_desired_lrp(process_guid).await
    }

    async fn actual_lrps(&self) -> Result<Vec<ActualLrp>, SchedulerError> {
        self.as_ref().actual_lrps().await
    }

    async fn actual_lrps_by_process_guid(
        &self,
        process_guid: &str,
    ) -> Result<Vec<ActualLrp>, SchedulerError> {
        self.as_ref().actual_lrps_by_process_guid(process_guid).await
    }
}
