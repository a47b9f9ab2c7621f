use std::collections::HashMap;

use log::{debug, info};
use model::{
    Action, ActualLrpState, DesiredLrp, DesiredLrpUpdateRequest, DownloadAction,
    EnvironmentVariable, RunAction, StartAppParams,
};
use port::SchedulerClient;

pub use error::AppRunnerError;

pub mod error;
pub mod model;
pub mod port;
pub mod target;

#[cfg(test)]
pub mod fake;

const LRP_DOMAIN: &str = "lattice";
const LRP_STACK: &str = "lucid64";
const APP_LOG_SOURCE: &str = "APP";
const HEALTH_LOG_SOURCE: &str = "HEALTH";
const HEALTH_PROBE_BINARY: &str = "spy";

/// Static configuration of an [`AppRunner`], fixed at construction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppRunnerSettings {
    /// Suffix of every app route, `{name}.{domain}`.
    pub domain: String,
    pub health_probe_url: String,
    /// Where the health probe archive is unpacked inside the container.
    pub health_probe_dir: String,
}

/// Drives app lifecycle against a remote scheduler. Holds no state of its
/// own: every decision is taken from a fresh listing.
pub struct AppRunner {
    pub scheduler: Box<dyn SchedulerClient + 'static + Sync + Send>,
    pub settings: AppRunnerSettings,
}

impl AppRunner {
    pub fn new(
        scheduler: Box<dyn SchedulerClient + 'static + Sync + Send>,
        settings: AppRunnerSettings,
    ) -> Self {
        Self {
            scheduler,
            settings,
        }
    }

    pub async fn start_app(&self, params: StartAppParams) -> Result<(), AppRunnerError> {
        if self.desired_lrp_exists(&params.name).await? {
            return Err(AppRunnerError::AlreadyExists(params.name));
        }
        let desired_lrp = self.build_desired_lrp(params);
        info!(
            "Desiring LRP {} with {} instances",
            desired_lrp.process_guid, desired_lrp.instances
        );
        self.scheduler.create_desired_lrp(&desired_lrp).await?;
        Ok(())
    }

    pub async fn scale_app(&self, name: &str, instances: u32) -> Result<(), AppRunnerError> {
        if !self.desired_lrp_exists(name).await? {
            return Err(AppRunnerError::NotStarted(name.to_string()));
        }
        info!("Scaling LRP {} to {} instances", name, instances);
        self.scheduler
            .update_desired_lrp(
                name,
                &DesiredLrpUpdateRequest {
                    instances: Some(instances),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    pub async fn remove_app(&self, name: &str) -> Result<(), AppRunnerError> {
        if !self.desired_lrp_exists(name).await? {
            return Err(AppRunnerError::NotStarted(name.to_string()));
        }
        info!("Removing LRP {}", name);
        self.scheduler.delete_desired_lrp(name).await?;
        Ok(())
    }

    /// Whether any instance of `name` is known to the scheduler. Looks at
    /// actual state, so a freshly started app reports `false` until placed
    /// and a removed one reports `true` until torn down.
    pub async fn app_exists(&self, name: &str) -> Result<bool, AppRunnerError> {
        let actual_lrps = self.scheduler.actual_lrps().await?;
        Ok(actual_lrps.iter().any(|lrp| lrp.process_guid == name))
    }

    pub async fn count_running_instances(&self, name: &str) -> Result<usize, AppRunnerError> {
        let instances = self.scheduler.actual_lrps_by_process_guid(name).await?;
        debug!("{} instances reported for {}", instances.len(), name);
        Ok(instances
            .iter()
            .filter(|instance| instance.state == ActualLrpState::Running)
            .count())
    }

    async fn desired_lrp_exists(&self, name: &str) -> Result<bool, AppRunnerError> {
        let desired_lrps = self.scheduler.desired_lrps().await?;
        debug!("{} desired LRPs listed", desired_lrps.len());
        Ok(desired_lrps.iter().any(|lrp| lrp.process_guid == name))
    }

    fn build_desired_lrp(&self, params: StartAppParams) -> DesiredLrp {
        let health_probe_dir = self.settings.health_probe_dir.trim_end_matches('/');
        DesiredLrp {
            routes: vec![format!("{}.{}", params.name, self.settings.domain)],
            domain: LRP_DOMAIN.to_string(),
            rootfs: params.docker_image_path,
            instances: params.instances,
            stack: LRP_STACK.to_string(),
            memory_mb: params.memory_mb,
            disk_mb: params.disk_mb,
            ports: vec![u32::from(params.port)],
            log_guid: params.name.clone(),
            log_source: APP_LOG_SOURCE.to_string(),
            env: build_environment_variables(params.environment_variables, params.port),
            setup: Some(Action::Download(DownloadAction {
                from: self.settings.health_probe_url.clone(),
                to: self.settings.health_probe_dir.clone(),
            })),
            action: Some(Action::Run(RunAction {
                path: params.start_command,
                args: params.app_args,
                privileged: params.privileged,
                dir: params.working_dir,
                ..Default::default()
            })),
            monitor: Some(Action::Run(RunAction {
                path: format!("{}/{}", health_probe_dir, HEALTH_PROBE_BINARY),
                args: vec!["-addr".to_string(), format!(":{}", params.port)],
                log_source: HEALTH_LOG_SOURCE.to_string(),
                ..Default::default()
            })),
            process_guid: params.name,
        }
    }
}

// A caller supplied PORT is passed through alongside ours.
fn build_environment_variables(
    environment_variables: HashMap<String, String>,
    port: u16,
) -> Vec<EnvironmentVariable> {
    let mut env: Vec<EnvironmentVariable> = environment_variables
        .into_iter()
        .map(|(name, value)| EnvironmentVariable { name, value })
        .collect();
    env.push(EnvironmentVariable {
        name: "PORT".to_string(),
        value: port.to_string(),
    });
    env
}
