use std::{collections::HashMap, process::ExitCode};

use anyhow::{Context, Error};
use clap::{builder::NonEmptyStringValueParser, Args, Parser, Subcommand};
use itertools::Itertools;
use log::info;
use tokio::net::TcpListener;

use crate::{
    config::{AppConfig, ReceptorConfig},
    domain::{
        model::StartAppParams,
        port::{SchedulerClient, SchedulerError},
        target::TargetVerifier,
        AppRunner, AppRunnerError, AppRunnerSettings,
    },
    infra::{
        receptor::{redacted_target, ReceptorClient},
        web::router,
    },
};

const DOCKER_ROOTFS_SCHEME: &str = "docker://";

#[derive(Debug, Parser)]
#[command(name = "ltc", about = "Manage docker apps on a lattice cluster")]
pub struct Cli {
    /// Configuration file, `ltc.{toml,json,yaml}` in the working directory when omitted.
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Check the configured receptor accepts our credentials
    Target,
    /// Start a docker app
    Start(StartArgs),
    /// Change the number of instances of a started app
    Scale { name: String, instances: u32 },
    /// Stop and remove an app
    Remove { name: String },
    /// Show whether an app is running and how many instances are up
    Status { name: String },
    /// Serve the app operations over HTTP
    Serve,
}

#[derive(Debug, Args)]
pub struct StartArgs {
    #[arg(value_parser = NonEmptyStringValueParser::new())]
    pub name: String,
    /// Image reference (`repo/image`) or rootfs path (`docker:///repo/image`)
    #[arg(long)]
    pub docker_image: String,
    #[arg(long)]
    pub start_command: String,
    #[arg(long, default_value_t = 1)]
    pub instances: u32,
    #[arg(long, default_value_t = 128)]
    pub memory_mb: u32,
    #[arg(long, default_value_t = 1024)]
    pub disk_mb: u32,
    #[arg(long, default_value_t = 8080)]
    pub port: u16,
    /// Environment variable as KEY=VALUE, may be repeated
    #[arg(long = "env", value_parser = parse_env_var)]
    pub env: Vec<(String, String)>,
    #[arg(long)]
    pub privileged: bool,
    #[arg(long, default_value = "/")]
    pub working_dir: String,
    /// Arguments passed to the start command
    #[arg(last = true)]
    pub app_args: Vec<String>,
}

impl StartArgs {
    fn into_params(self) -> StartAppParams {
        StartAppParams {
            name: self.name,
            start_command: self.start_command,
            docker_image_path: docker_rootfs_path(&self.docker_image),
            app_args: self.app_args,
            environment_variables: self.env.into_iter().collect::<HashMap<_, _>>(),
            privileged: self.privileged,
            instances: self.instances,
            memory_mb: self.memory_mb,
            disk_mb: self.disk_mb,
            port: self.port,
            working_dir: self.working_dir,
        }
    }
}

fn parse_env_var(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .filter(|(name, _)| !name.is_empty())
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| format!("expected KEY=VALUE, got {}", raw))
}

fn docker_rootfs_path(image: &str) -> String {
    if image.starts_with(DOCKER_ROOTFS_SCHEME) {
        image.to_string()
    } else {
        format!("{}/{}", DOCKER_ROOTFS_SCHEME, image)
    }
}

/// Exit status for a failed command: 2 already exists, 3 not started,
/// 4 unauthorized, 1 otherwise.
fn exit_status(e: &Error) -> u8 {
    match e.downcast_ref::<AppRunnerError>() {
        Some(AppRunnerError::AlreadyExists(_)) => 2,
        Some(AppRunnerError::NotStarted(_)) => 3,
        Some(AppRunnerError::Scheduler(SchedulerError::Unauthorized)) => 4,
        _ if matches!(
            e.downcast_ref::<SchedulerError>(),
            Some(SchedulerError::Unauthorized)
        ) =>
        {
            4
        }
        _ => 1,
    }
}

pub fn exit_code(e: &Error) -> ExitCode {
    ExitCode::from(exit_status(e))
}

fn unauthorized(target: &str) -> Error {
    Error::new(SchedulerError::Unauthorized).context(format!(
        "Could not authorize against {}",
        redacted_target(target)
    ))
}

fn app_runner(config: &AppConfig) -> Result<AppRunner, Error> {
    let receptor = ReceptorClient::from_config(&config.receptor)?;
    Ok(AppRunner::new(
        Box::new(receptor),
        AppRunnerSettings::from(config),
    ))
}

pub async fn run(command: Command, config: AppConfig) -> Result<(), Error> {
    match command {
        Command::Target => {
            let receptor_config = config.receptor.clone();
            let verifier = TargetVerifier::new(Box::new(move |target: &str| {
                ReceptorClient::from_config(&ReceptorConfig {
                    url: target.to_string(),
                    ..receptor_config.clone()
                })
                .map(|client| Box::new(client) as Box<dyn SchedulerClient + Sync + Send>)
                .map_err(|e| SchedulerError::InvalidTarget(format!("{:#}", e)))
            }));
            if verifier.validate_authorization(&config.receptor.url).await? {
                println!("Api Location Set: {}", redacted_target(&config.receptor.url));
                Ok(())
            } else {
                Err(unauthorized(&config.receptor.url))
            }
        }
        Command::Start(args) => {
            let params = args.into_params();
            let name = params.name.clone();
            let port = params.port;
            app_runner(&config)?.start_app(params).await?;
            println!(
                "{} is starting, it will be reachable at http://{}.{} (port {})",
                name, name, config.routing.domain, port
            );
            Ok(())
        }
        Command::Scale { name, instances } => {
            app_runner(&config)?.scale_app(&name, instances).await?;
            println!("{} scaled to {} instances", name, instances);
            Ok(())
        }
        Command::Remove { name } => {
            app_runner(&config)?.remove_app(&name).await?;
            println!("{} removed", name);
            Ok(())
        }
        Command::Status { name } => {
            let runner = app_runner(&config)?;
            let exists = runner.app_exists(&name).await?;
            let running = runner.count_running_instances(&name).await?;
            println!(
                "{}",
                [
                    format!("name: {}", name),
                    format!("exists: {}", exists),
                    format!("running instances: {}", running),
                ]
                .iter()
                .join("\n")
            );
            Ok(())
        }
        Command::Serve => {
            let runner = app_runner(&config)?;
            let listener = TcpListener::bind(&config.web.listen)
                .await
                .context(format!("Can't listen on {}", config.web.listen))?;
            info!("Serving app operations on {}", config.web.listen);
            axum::serve(listener, router(runner))
                .await
                .context("HTTP server stopped")
        }
    }
}
