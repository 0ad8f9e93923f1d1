//! Manifest-backed registration source.
//!
//! A manifest lists, per capability, the identifiers of the implementations a
//! deployable unit provides:
//!
//! ```toml
//! [[provides]]
//! capability = "Greeter"
//! implementations = ["greeter.en", "greeter.fr"]
//! ```
//!
//! JSON manifests with the same shape are accepted as well; the format is
//! chosen by file extension.

use super::RegistrationSource;
use crate::error::SourceError;
use config::{Config, FileFormat};
use delegation_api::ImplementationId;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use tracing::debug;

/// Parsed manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
	#[serde(default)]
	pub provides: Vec<Provision>,
}

/// One capability and the implementations declared for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provision {
	pub capability: String,
	pub implementations: Vec<ImplementationId>,
}

impl Manifest {
	/// Load and validate a manifest file.
	///
	/// # Errors
	/// Returns [`SourceError::Manifest`] if the file cannot be read or parsed
	/// and [`SourceError::Malformed`] if its content is invalid.
	pub fn load(path: &Path) -> Result<Self, SourceError> {
		let format = match path.extension().and_then(|extension| extension.to_str()) {
			Some("toml") => FileFormat::Toml,
			Some("json") => FileFormat::Json,
			_ => {
				return Err(SourceError::Malformed {
					path: path.to_path_buf(),
					reason: String::from("unsupported file extension (expected .toml or .json)"),
				})
			}
		};

		let manifest: Self = Config::builder()
			.add_source(config::File::from(path).format(format).required(true))
			.build()
			.and_then(Config::try_deserialize)
			.map_err(|source| SourceError::Manifest {
				path: path.to_path_buf(),
				source,
			})?;

		manifest.validate().map_err(|reason| SourceError::Malformed {
			path: path.to_path_buf(),
			reason,
		})?;

		debug!(
			manifest = %path.display(),
			provisions = manifest.provides.len(),
			"Loaded manifest"
		);
		Ok(manifest)
	}

	fn validate(&self) -> Result<(), String> {
		for provision in &self.provides {
			if provision.capability.trim().is_empty() {
				return Err(String::from("capability name cannot be empty"));
			}
			if provision
				.implementations
				.iter()
				.any(|id| id.as_str().trim().is_empty())
			{
				return Err(format!(
					"empty implementation identifier declared for capability {}",
					provision.capability
				));
			}
		}
		Ok(())
	}

	/// Identifiers declared for `capability`, in file order.
	pub fn declarations_for<'a>(
		&'a self,
		capability: &'a str,
	) -> impl Iterator<Item = &'a ImplementationId> + 'a {
		self.provides
			.iter()
			.filter(move |provision| provision.capability == capability)
			.flat_map(|provision| provision.implementations.iter())
	}
}

/// Reads declarations from manifest files.
///
/// The files are loaded together the first time any capability is queried,
/// not when the source is created, so a broken manifest only surfaces once
/// discovery needs it. Later queries answer from the loaded declarations,
/// including a load failure, which is reported again unchanged.
#[derive(Debug, Default)]
pub struct ManifestSource {
	paths: Vec<PathBuf>,
	loaded: OnceLock<Result<Vec<Manifest>, Arc<SourceError>>>,
}

impl ManifestSource {
	pub fn new<I, P>(paths: I) -> Self
	where
		I: IntoIterator<Item = P>,
		P: Into<PathBuf>,
	{
		Self {
			paths: paths.into_iter().map(Into::into).collect(),
			loaded: OnceLock::new(),
		}
	}

	fn manifests(&self) -> Result<&[Manifest], SourceError> {
		self.loaded
			.get_or_init(|| {
				self.paths
					.iter()
					.map(|path| Manifest::load(path))
					.collect::<Result<Vec<_>, _>>()
					.map_err(Arc::new)
			})
			.as_deref()
			.map_err(|error| SourceError::Shared(Arc::clone(error)))
	}
}

impl RegistrationSource for ManifestSource {
	fn declarations_for(&self, capability: &str) -> Result<Vec<ImplementationId>, SourceError> {
		Ok(self
			.manifests()?
			.iter()
			.flat_map(|manifest| manifest.declarations_for(capability))
			.cloned()
			.collect())
	}
}
