use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use fbx_policymap::profile::load_profile;
use fbx_policymap::report::render_interfaces;
use fbx_policymap::settings::{default_settings, load_settings, Settings};
use tracing::{debug, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod policies_cmd;
mod resolve_cmd;

use cli::{Cli, Command, InterfacesArgs, OutputFormat};

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let (settings, source) = resolve_settings(cli.settings.as_deref());
    debug!(source = %source, "loaded settings");

    match cli.command {
        Command::Resolve(args) => resolve_cmd::run_resolve(args, &settings),
        Command::Policies(args) => policies_cmd::run_policies(args, &settings),
        Command::Interfaces(args) => run_interfaces(args, &settings),
        Command::Subnets(args) => policies_cmd::run_subnets(args, &settings),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = if verbose > 0 {
        EnvFilter::new(level)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn resolve_settings(path: Option<&Path>) -> (Settings, String) {
    let Some(path) = path else {
        return (default_settings(), "embedded".to_string());
    };

    match load_settings(path) {
        Ok(settings) => (settings, format!("file:{}", path.display())),
        Err(err) => {
            warn!("{err}; using embedded defaults");
            (default_settings(), "embedded".to_string())
        }
    }
}

fn run_interfaces(args: InterfacesArgs, settings: &Settings) -> Result<()> {
    let profile = load_profile(&args.profile, settings)
        .with_context(|| format!("failed to load {}", args.profile.display()))?;
    let interfaces = profile.domain.interfaces();

    match args.format {
        OutputFormat::Text => println!("{}", render_interfaces(interfaces)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(interfaces)?),
    }
    Ok(())
}
