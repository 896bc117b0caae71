use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tracing::{error, info};

use crate::config;
use crate::health::{self, HealthState};
use crate::providers;
use crate::scheduler;
use crate::sync::run::{Groomer, SyncSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// First run, then one run per interval until interrupted.
    Run,
    /// A single pass.
    Once,
    CheckConfig,
    Help,
}

/// Parse the arguments following the program name.
pub fn parse_args(args: &[String]) -> Result<Command> {
    let command = match args.first().map(String::as_str) {
        None | Some("run") => Command::Run,
        Some("once") => Command::Once,
        Some("check-config") => Command::CheckConfig,
        Some("help") | Some("-h") | Some("--help") => Command::Help,
        Some(other) => bail!("Unknown command: {other}\n\nRun `groomer help` for usage."),
    };
    if let Some(extra) = args.get(1) {
        bail!("Unexpected argument: {extra}");
    }
    Ok(command)
}

fn build_groomer(settings: &config::Settings) -> Groomer {
    let (boards, tasks) = providers::create_services(settings);
    Groomer::new(boards, tasks, SyncSettings::from(settings))
}

/// Groom both boards on the configured interval until ctrl-c.
pub async fn handle_run() -> Result<()> {
    let settings = config::load_settings()?;
    info!(interval_secs = settings.interval.as_secs(), "starting groomer");
    let groomer = Arc::new(build_groomer(&settings));
    let health_state = HealthState::default();

    if settings.health.enabled {
        let bind = settings.health.bind.clone();
        let state = health_state.clone();
        tokio::spawn(async move {
            if let Err(e) = health::serve(&bind, state).await {
                error!(error = %e, "health endpoint failed");
            }
        });
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "could not listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    let runs = scheduler::run_on_interval(
        settings.interval,
        |run| {
            let groomer = groomer.clone();
            let health_state = health_state.clone();
            async move {
                let result = groomer.run_logged(run).await;
                health_state.record(run, &result).await;
            }
        },
        shutdown,
    )
    .await;

    info!(runs, "groomer stopped");
    Ok(())
}

/// One pass; fails if the pass aborted.
pub async fn handle_once() -> Result<()> {
    let settings = config::load_settings()?;
    let stats = build_groomer(&settings)
        .run_logged(1)
        .await
        .context("Run aborted")?;
    println!("{stats}");
    Ok(())
}

pub fn handle_check_config() -> Result<()> {
    let settings = config::load_settings()?;
    println!("{settings}");
    Ok(())
}

pub fn print_help() {
    println!("groomer - keeps a project board and a task list in step\n");
    println!("USAGE:");
    println!("  groomer                Groom on the configured interval (same as `run`)");
    println!("  groomer run            Groom on the configured interval until ctrl-c");
    println!("  groomer once           Run a single pass and exit");
    println!("  groomer check-config   Validate the configuration and print it");
    println!("  groomer help           Show this message");
    println!();
    println!("CONFIG:");
    println!("  $CONFIG_PATH, or groomer/config.toml in the user config directory");
    println!("  TRELLO_API_KEY, TRELLO_TOKEN and TODOIST_TOKEN override the file");
    println!();
    println!("LOGGING:");
    println!("  RUST_LOG=debug groomer once");
}
