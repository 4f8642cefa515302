use clap::Parser;

mod cli;
mod commands;
mod orchestrators;

use cli::{Cli, Command};

#[tokio::main]
async fn main() {
    // Load environment variables from .env when present.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose());

    let exit_code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("❌ {e:#}");
            1
        }
    };
    std::process::exit(exit_code);
}

async fn run(cli: Cli) -> anyhow::Result<i32> {
    match cli.command {
        Command::Describe(args) => {
            commands::describe::run(args).await?;
            Ok(0)
        }
        Command::Review(args) => {
            commands::review::run(args).await?;
            Ok(0)
        }
        Command::CheckReviewed(args) => commands::check_reviewed::run(args).await,
        Command::Healthcheck => commands::healthcheck::run().await,
    }
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let debug_env = std::env::var("LAMPE_SDK_DEBUG")
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false);
    let default_level = if verbose || debug_env { "debug" } else { "info" };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
