mod commands;
mod expect;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

/// Exit code used when the harness itself fails (as opposed to the command
/// under test or an expectation).
const HARNESS_ERROR_EXIT: i32 = 2;

#[derive(Parser)]
#[command(name = "harnessctl", version, about = "Run commands inside disposable workspaces")]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a command line in a fresh workspace and print the result as JSON
    Run(commands::run::RunArgs),
    /// Write a manifest, install and verify inside a fresh workspace
    Deploy(commands::deploy::DeployArgs),
    /// Print the effective harness configuration as YAML
    Config(commands::show_config::ConfigArgs),
}

fn init_tracing() {
    let _ = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.cmd {
        Commands::Run(args) => commands::run::run(args),
        Commands::Deploy(args) => commands::deploy::run(args),
        Commands::Config(args) => commands::show_config::run(args),
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(HARNESS_ERROR_EXIT);
        }
    }
}
