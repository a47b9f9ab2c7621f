use std::process::ExitCode;

use clap::Parser;
use cli::{exit_code, run, Cli};
use crate::config::load_config;
use log::{debug, error};

mod cli;
mod config;
mod domain;
mod infra;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match load_config(cli.config.as_deref()) {
        Ok(config) => {
            debug!("Loaded config {:?}", config);
            run(cli.command, config).await
        }
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            exit_code(&e)
        }
    }
}
