use thiserror::Error;

use super::port::SchedulerError;

#[derive(Debug, Error)]
pub enum AppRunnerError {
    #[error("App {0} already exists")]
    AlreadyExists(String),

    #[error("App {0} not started")]
    NotStarted(String),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
}
