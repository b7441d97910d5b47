mod agent;
mod settings;
mod web;

use clap::{Parser, Subcommand};
use std::process::ExitCode;

use web::Config;

#[derive(Parser)]
#[command(name = "trackd")]
#[command(about = "Background location reporting agent")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file
    Validate { config: String },
    /// Run the agent with a configuration file
    Run { config: String },
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config } => validate(&config),
        Commands::Run { config } => run(&config).await,
    }
}

fn validate(path: &str) -> ExitCode {
    match Config::from_file(path) {
        Ok(config) => {
            let endpoints = config.delivery.endpoints();
            println!("Configuration is valid ({} endpoint(s))", endpoints.len());
            for (i, url) in endpoints.iter().enumerate() {
                let role = if i == 0 { "primary" } else { "backup" };
                println!("  {}: {} ({})", i + 1, url, role);
            }
            println!(
                "  distance threshold: {} m, update interval: {:?}",
                config.agent.distance_threshold_m, config.agent.update_interval
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Config error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(path: &str) -> ExitCode {
    let config = match Config::from_file(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = web::run_server(config).await {
        eprintln!("Server error: {}", e);
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
