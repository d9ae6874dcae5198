// Main entry point for testcast

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use testcast::cli::{Cli, Commands};
use testcast::commands::run_replay;
use testcast::config::{self, Config};

fn main() -> Result<()> {
    // Load configuration from file (if exists)
    let config = Config::load();

    let cli = Cli::parse();

    testcast::logging::init(cli.verbose);

    if cli.verbose {
        info!("Starting testcast v{}", env!("CARGO_PKG_VERSION"));
    }

    if let Some(path) = &cli.init_config {
        let content = Config::default().to_toml();
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write configuration file: {}", path.display()))?;
        println!("Created configuration file: {}", path.display());
        return Ok(());
    }

    if cli.config {
        match &config {
            Some(cfg) => {
                println!("Current configuration:");
                print!("{}", cfg.to_toml());
            }
            None => {
                println!("No configuration file loaded, using defaults:");
                print!("{}", Config::default().to_toml());
                println!(
                    "\nCreate one with: testcast --init-config {}",
                    config::CONFIG_FILE_NAME
                );
            }
        }
        return Ok(());
    }

    match &cli.command {
        Some(Commands::Replay(args)) => {
            let result = run_replay(args, config)?;
            if result.had_failures() {
                println!("{}", console::style("TESTS FAILED").red().bold());
                std::process::exit(result.exit_code());
            }
            println!("{}", console::style("TESTS PASSED").green().bold());
            Ok(())
        }
        None => {
            eprintln!("No command given. Run `testcast --help` for usage.");
            std::process::exit(2);
        }
    }
}
