mod cli;
mod config;
mod error;
mod health;
mod model;
mod providers;
mod scheduler;
mod sync;

use anyhow::Result;

use cli::Command;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match cli::parse_args(&args)? {
        Command::Run => cli::handle_run().await,
        Command::Once => cli::handle_once().await,
        Command::CheckConfig => cli::handle_check_config(),
        Command::Help => {
            cli::print_help();
            Ok(())
        }
    }
}
