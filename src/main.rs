// ABOUTME: Entry point for the registry-gc CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use registry_gc::config::{self, Config};
use registry_gc::error::{Error, Result};
use registry_gc::output::Output;
use std::env;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over the verbose flag when set
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let mut output = Output::new(cli.output.into());

    if let Err(e) = run(cli, &mut output).await {
        output.error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli, output: &mut Output) -> Result<()> {
    match cli.command {
        Commands::Init { force } => {
            let cwd = env::current_dir()?;
            config::init_config(&cwd, cli.registry.as_deref(), force)?;
            output.success(&format!("Created {}", config::CONFIG_FILENAME));
            Ok(())
        }
        Commands::List { ref repositories } => {
            let mut config = load_config(&cli)?;
            if !repositories.is_empty() {
                config.repositories = repositories.clone();
            }
            commands::list(&config, output).await
        }
        Commands::Gc(ref args) => {
            let mut config = load_config(&cli)?;
            commands::apply_gc_overrides(&mut config, args)?;
            commands::gc(&config, args.dry_run, output).await
        }
        Commands::Serve { listen, ref path } => {
            let mut config = load_config(&cli)?;
            if let Some(listen) = listen {
                config.exporter.listen = listen;
            }
            if let Some(path) = path {
                config.exporter.path = path.clone();
            }
            config.validate()?;
            commands::serve(&config, output).await
        }
    }
}

/// `--config` file, else a discovered file, else defaults for `--registry`.
fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = match (&cli.config, &cli.registry) {
        (Some(path), _) => Config::load(path)?,
        (None, registry) => {
            let cwd = env::current_dir()?;
            match (Config::discover(&cwd), registry) {
                (Ok(config), _) => config,
                (Err(Error::ConfigNotFound(_)), Some(url)) => Config::for_registry(url.clone()),
                (Err(e), _) => return Err(e),
            }
        }
    };

    if let Some(url) = &cli.registry {
        config.registry.url = url.clone();
    }
    config.validate()?;
    Ok(config)
}
