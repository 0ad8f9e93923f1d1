use delegation_api::{BoxError, ImplementationId};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced by [`Registry::get_all`](crate::Registry::get_all) and
/// [`Registry::get`](crate::Registry::get).
///
/// Discovery failures are cached together with the capability they belong to,
/// so the error is cheap to clone and every later call reports the same one.
#[derive(Debug, Clone, Error)]
pub enum LookupError {
	#[error("Registration source unavailable for capability {capability}: {source}")]
	SourceUnavailable {
		capability: &'static str,
		source: Arc<SourceError>,
	},

	#[error("Failed to instantiate provider {implementation} of capability {capability}: {reason}")]
	ProviderInstantiation {
		capability: &'static str,
		implementation: ImplementationId,
		#[source]
		reason: InstantiationFailure,
	},

	#[error("No provider of capability {capability} is named {name:?}")]
	NameNotFound { capability: &'static str, name: String },

	#[error("Provider {implementation} of capability {capability} has an invalid name: {reason}")]
	InvalidProviderName {
		capability: &'static str,
		implementation: ImplementationId,
		#[source]
		reason: InvalidName,
	},
}

impl LookupError {
	/// The capability whose lookup failed.
	pub const fn capability(&self) -> &'static str {
		match self {
			Self::SourceUnavailable { capability, .. }
			| Self::ProviderInstantiation { capability, .. }
			| Self::NameNotFound { capability, .. }
			| Self::InvalidProviderName { capability, .. } => capability,
		}
	}
}

/// Why a declared implementation could not be turned into a provider.
#[derive(Debug, Clone, Error)]
pub enum InstantiationFailure {
	#[error("no implementation with this identifier is registered")]
	Missing,

	#[error("implementation provides capability {provided} instead")]
	IncompatibleContract { provided: &'static str },

	#[error("constructor failed: {0}")]
	Constructor(#[source] Arc<dyn std::error::Error + Send + Sync>),

	#[error("constructor panicked: {0}")]
	Panicked(String),
}

/// Why a provider's name was rejected while building the name index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidName {
	#[error("name is empty")]
	Empty,

	#[error("name changed between calls ({first:?}, then {second:?})")]
	Unstable { first: String, second: String },

	#[error("reading the name panicked: {0}")]
	Panicked(String),
}

/// Errors reported by a [`RegistrationSource`](crate::source::RegistrationSource).
#[derive(Debug, Error)]
pub enum SourceError {
	#[error("Failed to read manifest {}: {source}", .path.display())]
	Manifest {
		path: PathBuf,
		source: config::ConfigError,
	},

	#[error("Malformed manifest {}: {reason}", .path.display())]
	Malformed { path: PathBuf, reason: String },

	#[error(transparent)]
	Other(BoxError),

	/// A failure reported earlier and kept by the source.
	#[error(transparent)]
	Shared(Arc<SourceError>),
}

impl SourceError {
	/// The underlying error, looking through [`SourceError::Shared`].
	pub fn root(&self) -> &Self {
		match self {
			Self::Shared(error) => error.root(),
			error => error,
		}
	}
}
