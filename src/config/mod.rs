use crate::registry::DuplicateNames;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Environment variables with this prefix override file settings,
/// e.g. `DELEGATION_LOGGING__LEVEL=debug`.
pub const ENV_PREFIX: &str = "DELEGATION";

/// Optional configuration file looked up in the working directory.
pub const CONFIG_FILE: &str = "delegation.toml";

#[derive(Debug, Clone, Deserialize)]
pub struct RegistryConfig {
	pub logging: LoggingConfig,
	pub names: NamesConfig,
	/// Manifest files consulted in addition to statically declared providers.
	#[serde(default)]
	pub manifests: Vec<PathBuf>,
}

impl RegistryConfig {
	/// Load the configuration from the embedded defaults, an optional
	/// `delegation.toml` in the working directory and the environment.
	///
	/// # Errors
	/// Returns a [`config::ConfigError`] if a source cannot be read or the
	/// merged result does not deserialize.
	pub fn new() -> Result<Self, config::ConfigError> {
		Self::in_dir(Path::new("."))
	}

	fn in_dir(dir: &Path) -> Result<Self, config::ConfigError> {
		Self::build(config::File::from(dir.join(CONFIG_FILE)).required(false))
	}

	/// Like [`RegistryConfig::new`], but reads `path` instead of
	/// `delegation.toml` and requires it to exist.
	///
	/// # Errors
	/// Returns a [`config::ConfigError`] if `path` is missing or invalid.
	pub fn from_file(path: &Path) -> Result<Self, config::ConfigError> {
		Self::build(config::File::from(path).required(true))
	}

	fn build(
		file: config::File<config::FileSourceFile, config::FileFormat>,
	) -> Result<Self, config::ConfigError> {
		use config::Config;
		let s = Config::builder()
			.add_source(config::File::from_str(
				include_str!("defaults.toml"),
				config::FileFormat::Toml,
			))
			.add_source(file)
			.add_source(
				config::Environment::with_prefix(ENV_PREFIX)
					.prefix_separator("_")
					.separator("__")
					.list_separator(",")
					.with_list_parse_key("manifests")
					.try_parsing(true),
			)
			.build()?;

		s.try_deserialize()
	}
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
	// Default log level. RUST_LOG takes precedence when set.
	pub level: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamesConfig {
	/// Policy for names declared by more than one provider.
	pub duplicates: DuplicateNames,
}
