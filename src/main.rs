mod tools;

use clap::Parser;
use delegation::config::RegistryConfig;
use delegation::{Catalog, Registry};
use std::path::PathBuf;
use tools::{Context, Tool};
use tracing::{error, level_filters::LevelFilter, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Run a tool discovered through the provider registry.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
	/// Configuration file to read instead of `delegation.toml`
	#[arg(short, long)]
	config: Option<PathBuf>,

	/// Name of the tool to run
	#[arg(default_value = tools::DEFAULT_TOOL)]
	tool: String,

	/// Arguments passed on to the tool
	#[arg(trailing_var_arg = true, allow_hyphen_values = true)]
	args: Vec<String>,
}

/// Used when `logging.level` is not a level; matches `defaults.toml`.
const FALLBACK_LEVEL: LevelFilter = LevelFilter::WARN;

fn init_logger(level: LevelFilter) {
	tracing_subscriber::registry()
		.with(
			tracing_subscriber::fmt::layer()
				.compact()
				.with_ansi(true)
				.with_file(false)
				.with_line_number(false)
				.with_target(false)
				.with_writer(std::io::stderr),
		)
		.with(
			EnvFilter::builder()
				.with_default_directive(level.into())
				.from_env_lossy(),
		)
		.init();
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
	let cli = Cli::parse();
	let config = match &cli.config {
		Some(path) => RegistryConfig::from_file(path)?,
		None => RegistryConfig::new()?,
	};

	let level = config.logging.level.parse::<LevelFilter>();
	init_logger(*level.as_ref().unwrap_or(&FALLBACK_LEVEL));
	if level.is_err() {
		warn!(level = %config.logging.level, "Unknown log level, using {FALLBACK_LEVEL}");
	}

	if let Err(error) = run(&cli, &config) {
		error!("{error:#}");
		std::process::exit(1);
	}
	Ok(())
}

fn run(cli: &Cli, config: &RegistryConfig) -> anyhow::Result<()> {
	let registry = Registry::from_config(config, Catalog::declared());
	let tool = registry.get::<dyn Tool>(&cli.tool)?;

	tool.run(
		&Context {
			registry: &registry,
			config,
		},
		&cli.args,
	)
}
